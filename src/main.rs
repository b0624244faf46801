// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 示例服务
//!
//! 加载配置、初始化日志、构建密钥与路由，然后启动 HTTP 服务器。

use webframework::{
    backend::{self, UserDb},
    security::{KeyPair, KeyStore},
    Config, Framework, HttpServer,
};

use log::{error, info};
use tokio::runtime::Builder;

use std::{process::ExitCode, sync::Arc};

fn main() -> ExitCode {
    // 日志配置缺失时仍然继续运行，只是没有日志输出
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    let config = match Config::from_toml("config/development.toml") {
        Ok(config) => config,
        Err(e) => {
            error!("{}，使用默认配置", e);
            Config::new()
        }
    };
    info!("配置文件已载入");
    info!("www root: {}", config.www_root());

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads().max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("服务器异常退出：{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), webframework::Exception> {
    let key_store = Arc::new(KeyStore::new(
        KeyPair::secret(config.jwt_secret().as_bytes()),
        KeyPair::secret(config.jwt_refresh_secret().as_bytes()),
    ));

    let mut framework = Framework::from_config(&config);
    backend::register_routes(&mut framework, key_store, UserDb::default(), config.token_expiration())?;
    info!("已注册{}个端点", framework.routes().len());

    let server = HttpServer::bind(Arc::new(framework), &config).await?;
    server.run().await
}
