// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # TCP 服务器
//!
//! 接受循环运行在独立任务上，每个连接派生一个任务处理。
//! 并发连接数由信号量限制：拿到许可之后才接受下一个连接。

use crate::{
    config::Config,
    connection::{handle_connection, ConnectionSettings},
    exception::Exception,
    framework::Framework,
};

use log::{debug, error, info};
use tokio::{net::TcpListener, sync::Semaphore};

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

pub struct HttpServer {
    listener: TcpListener,
    framework: Arc<Framework>,
    settings: ConnectionSettings,
    limit: Arc<Semaphore>,
}

impl HttpServer {
    /// 支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)，端口为 0 时由系统分配
    pub async fn bind(framework: Arc<Framework>, config: &Config) -> Result<Self, Exception> {
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let socket = SocketAddrV4::new(address, config.port());
        let listener = TcpListener::bind(socket).await.map_err(|e| {
            error!("无法绑定端口：{}，错误：{}", config.port(), e);
            Exception::Io(e)
        })?;
        info!("服务端将在{}上监听Socket连接", listener.local_addr()?);

        Ok(Self {
            listener,
            framework,
            settings: ConnectionSettings::from(config),
            limit: Arc::new(Semaphore::new(config.max_connections().max(1))),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Exception> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<(), Exception> {
        let mut id: u128 = 0;

        loop {
            let permit = match self.limit.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    info!("连接许可已关闭，服务器退出");
                    return Ok(());
                }
            };

            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("接受连接失败: {}", e);
                    continue;
                }
            };
            debug!("[ID{}]TCP连接已建立：{}", id, addr);

            let framework = Arc::clone(&self.framework);
            let settings = self.settings;
            tokio::spawn(async move {
                handle_connection(stream, id, framework, settings).await;
                drop(permit);
            });
            id += 1;
        }
    }
}
