// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::exception::Exception;

use log::warn;
use serde_derive::{Deserialize, Serialize};
use std::fs;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_static_url_path")]
    static_url_path: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_cache_size")]
    cache_size: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_read_chunk_size")]
    read_chunk_size: usize,
    #[serde(default = "default_max_header_size")]
    max_header_size: usize,
    #[serde(default = "default_keep_alive_timeout")]
    keep_alive_timeout: u64,
    #[serde(default = "default_max_connections")]
    max_connections: usize,
    #[serde(default = "default_token_expiration")]
    token_expiration: i64,
    #[serde(default = "default_jwt_secret")]
    jwt_secret: String,
    #[serde(default)]
    jwt_refresh_secret: Option<String>,
}

fn default_www_root() -> String {
    "static".to_string()
}

fn default_static_url_path() -> String {
    "index.html".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_cache_size() -> usize {
    5
}

fn default_local() -> bool {
    true
}

fn default_read_chunk_size() -> usize {
    2048
}

fn default_max_header_size() -> usize {
    65536 // 64KB
}

fn default_keep_alive_timeout() -> u64 {
    10
}

fn default_max_connections() -> usize {
    1024
}

fn default_token_expiration() -> i64 {
    60 * 30
}

fn default_jwt_secret() -> String {
    "change-me".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            www_root: default_www_root(),
            static_url_path: default_static_url_path(),
            port: default_port(),
            worker_threads: 0,
            cache_size: default_cache_size(),
            local: default_local(),
            read_chunk_size: default_read_chunk_size(),
            max_header_size: default_max_header_size(),
            keep_alive_timeout: default_keep_alive_timeout(),
            max_connections: default_max_connections(),
            token_expiration: default_token_expiration(),
            jwt_secret: default_jwt_secret(),
            jwt_refresh_secret: None,
        }
    }
}

impl Config {
    /// 全部取默认值，并与从文件载入时一样做修正
    pub fn new() -> Self {
        let mut config = Self::default();
        config.normalize();
        config
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let content = fs::read_to_string(filename)
            .map_err(|e| Exception::Config(format!("无法读取配置文件{}: {}", filename, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Exception> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Exception::Config(e.to_string()))?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.cache_size == 0 {
            warn!("cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为5。");
            self.cache_size = default_cache_size();
        }
        if self.read_chunk_size == 0 {
            warn!("read_chunk_size不能为0，使用默认值{}", default_read_chunk_size());
            self.read_chunk_size = default_read_chunk_size();
        }
        if self.max_connections == 0 {
            warn!("max_connections不能为0，使用默认值{}", default_max_connections());
            self.max_connections = default_max_connections();
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_www_root(mut self, www_root: &str) -> Self {
        self.www_root = www_root.to_string();
        self
    }

    pub fn with_keep_alive_timeout(mut self, seconds: u64) -> Self {
        self.keep_alive_timeout = seconds;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn static_url_path(&self) -> &str {
        &self.static_url_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn read_chunk_size(&self) -> usize {
        self.read_chunk_size
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    pub fn keep_alive_timeout(&self) -> u64 {
        self.keep_alive_timeout
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn token_expiration(&self) -> i64 {
        self.token_expiration
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// 未单独配置时，刷新令牌密钥由访问令牌密钥派生
    pub fn jwt_refresh_secret(&self) -> String {
        self.jwt_refresh_secret
            .clone()
            .unwrap_or_else(|| format!("{}.refresh", self.jwt_secret))
    }
}
