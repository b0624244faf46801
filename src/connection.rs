// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理
//!
//! 每个连接一个任务：按 `Content-Length` 组装完整请求，交给框架生成响应，
//! 然后根据 `Connection: keep-alive` 决定是否继续在同一连接上读取下一个请求。
//!
//! 读到的多余字节（流水线中的下一个请求）会留到下一轮。
//! 任何帧错误都直接断开连接，不发送响应。

use crate::{
    config::Config,
    exception::Exception,
    framework::Framework,
    param::{DEFAULT_KEEP_ALIVE_SECS, HEADER_SEPARATOR},
    request::{find_header_end, Request},
    timer::RestartableTimer,
};

use bytes::BytesMut;
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Notify,
};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// 连接级参数
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_chunk_size: usize,
    pub max_header_size: usize,
    pub keep_alive_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_chunk_size: 2048,
            max_header_size: 64 * 1024,
            keep_alive_timeout: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
        }
    }
}

impl From<&Config> for ConnectionSettings {
    fn from(config: &Config) -> Self {
        Self {
            read_chunk_size: config.read_chunk_size().max(1),
            max_header_size: config.max_header_size(),
            keep_alive_timeout: Duration::from_secs(config.keep_alive_timeout()),
        }
    }
}

/// 关闭信号。定时器与主循环都可能触发关闭，多次关闭等价于一次。
#[derive(Debug, Default)]
pub struct CloseSignal {
    closed: AtomicBool,
    notify: Notify,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回 `true` 表示本次调用真正完成了关闭
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn closed(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

pub async fn handle_connection<S>(mut stream: S, id: u128, framework: Arc<Framework>, settings: ConnectionSettings)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let close = Arc::new(CloseSignal::new());
    let mut keep_alive: Option<RestartableTimer> = None;
    let mut pending = BytesMut::new();
    let mut served = 0usize;

    loop {
        let result = tokio::select! {
            _ = close.closed() => {
                debug!("[ID{}]keep-alive超时，关闭连接", id);
                break;
            }
            result = read_request(&mut stream, &mut pending, id, &settings, keep_alive.as_ref()) => result,
        };

        let request = match result {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("[ID{}]客户端关闭了连接", id);
                break;
            }
            Err(e) if e.is_protocol_error() => {
                warn!("[ID{}]请求报文不合法，断开连接: {}", id, e);
                break;
            }
            Err(e) => {
                debug!("[ID{}]读取请求失败，断开连接: {}", id, e);
                break;
            }
        };

        let start_time = Instant::now();
        let response = framework.respond(&request);
        debug!(
            "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
            id,
            start_time.elapsed().as_millis()
        );
        info!(
            "[ID{}] {}, {}, {}, {}, {}, {}, ",
            id,
            request.version(),
            request.path(),
            request.method(),
            response.status_code(),
            response.information(),
            request.user_agent(),
        );

        if let Err(e) = write_response(&mut stream, &response.data()).await {
            error!("[ID{}]发送响应失败: {}", id, e);
            break;
        }
        served += 1;

        if !request.keep_alive() {
            break;
        }
        match &keep_alive {
            Some(timer) => timer.reset(),
            None => {
                let timeout = request.keep_alive_timeout().unwrap_or(settings.keep_alive_timeout);
                let signal = close.clone();
                let timer = RestartableTimer::new(
                    timeout,
                    Arc::new(move || {
                        signal.close();
                    }),
                );
                debug!("[ID{}]启用keep-alive，超时{}s", id, timer.interval().as_secs());
                timer.start();
                keep_alive = Some(timer);
            }
        }
    }

    if let Some(timer) = keep_alive.take() {
        timer.cancel();
    }
    close.close();
    let _ = stream.shutdown().await;
    debug!("[ID{}]连接已关闭，共处理{}个请求", id, served);
}

async fn write_response<S: AsyncWrite + Unpin>(stream: &mut S, data: &[u8]) -> Result<(), Exception> {
    stream.write_all(data).await?;
    stream.flush().await?;
    Ok(())
}

/// 读取一个完整的请求。对端在请求开始前关闭连接时返回 `Ok(None)`。
pub async fn read_request<S>(
    stream: &mut S,
    pending: &mut BytesMut,
    id: u128,
    settings: &ConnectionSettings,
    timer: Option<&RestartableTimer>,
) -> Result<Option<Request>, Exception>
where
    S: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; settings.read_chunk_size];

    let header_end = loop {
        if let Some(end) = find_header_end(pending) {
            break end;
        }
        if pending.len() > settings.max_header_size {
            return Err(Exception::HeaderTooLarge);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return match pending.is_empty() {
                true => Ok(None),
                false => Err(Exception::UnexpectedEof),
            };
        }
        if let Some(timer) = timer {
            timer.reset();
        }
        pending.extend_from_slice(&chunk[..n]);
    };
    if header_end > settings.max_header_size {
        return Err(Exception::HeaderTooLarge);
    }

    let head = pending.split_to(header_end + HEADER_SEPARATOR.len());
    let mut request = Request::try_from(&head, id)?;
    let declared = request.content_length().unwrap_or(0);
    debug!("[ID{}]请求头解析完毕，声明的请求体长度{}", id, declared);

    while pending.len() < declared {
        let limit = (declared - pending.len()).min(chunk.len());
        let n = stream.read(&mut chunk[..limit]).await?;
        if n == 0 {
            return Err(Exception::UnexpectedEof);
        }
        if let Some(timer) = timer {
            timer.reset();
        }
        pending.extend_from_slice(&chunk[..n]);
    }

    request.set_body(pending.split_to(declared).freeze());
    Ok(Some(request))
}
