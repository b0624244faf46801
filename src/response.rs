// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建模块
//!
//! 负责把处理器的返回值（或错误）组装成最终的响应报文：
//! 状态行、`Content-Type`、`Content-Length`、空行，然后是正文。
//!
//! 处理器失败时依次尝试端点自身的错误处理器、框架级默认错误处理器，
//! 两者都失败时输出一个通用的 500 响应，保证客户端总能收到合法的响应。

use crate::{
    cache::FileCache,
    exception::HandlerError,
    param::*,
    request::Request,
    route::{Endpoint, ErrorHandler},
};

use bytes::Bytes;
use log::{debug, error, warn};
use serde_json::Value;

use std::{
    any::Any,
    collections::HashMap,
    fs,
    panic::{catch_unwind, AssertUnwindSafe},
    path::Path,
    sync::Mutex,
};

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: ContentType,
    body: Bytes,
}

impl Response {
    pub fn new(content_type: ContentType, version: HttpVersion) -> Self {
        Self {
            version,
            status_code: 200,
            information: "OK".to_string(),
            content_type,
            body: Bytes::new(),
        }
    }

    /// 设置状态码并同步原因短语。未登记的状态码使用 `Unknown` 作为原因短语。
    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match reason_phrase(code) {
            Some(reason) => reason.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown".to_string()
            }
        };
        self
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = content_type;
        self
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn not_found(version: HttpVersion) -> Self {
        Self::new(ContentType::Text, version).set_status(404).to_owned()
    }

    pub fn internal_error(content_type: ContentType, version: HttpVersion) -> Self {
        Self::new(content_type, version)
            .set_status(500)
            .set_body("Internal Server Error")
            .to_owned()
    }

    /// 从磁盘读取静态文件，内容通过 LRU 缓存复用，修改时间变化即失效。
    pub fn from_file(request: &Request, path: &Path, cache: &Mutex<FileCache>) -> Self {
        let id = request.id();
        let version = request.version();
        let metadata = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                debug!("[ID{}]静态文件{}不存在，返回404", id, path.display());
                return Self::not_found(version);
            }
        };
        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(ContentType::from_extension)
            .unwrap_or_else(|| ContentType::from_extension("_"));
        let modified_time = match metadata.modified() {
            Ok(time) => time,
            Err(e) => {
                error!("[ID{}]无法获取文件{}的修改时间: {}", id, path.display(), e);
                return Self::internal_error(ContentType::Text, version);
            }
        };
        let key = path.to_string_lossy();

        let mut cache_lock = match cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("[ID{}]缓存锁被污染，恢复并继续", id);
                poisoned.into_inner()
            }
        };
        let content = match cache_lock.find(&key, modified_time) {
            Some(bytes) => {
                debug!("[ID{}]缓存命中，大小: {} bytes", id, bytes.len());
                bytes.clone()
            }
            None => {
                debug!("[ID{}]缓存未命中或文件已修改，读取文件: {}", id, key);
                let bytes = match fs::read(path) {
                    Ok(contents) => Bytes::from(contents),
                    Err(e) => {
                        error!("[ID{}]无法读取文件{}。错误：{}", id, key, e);
                        return Self::internal_error(ContentType::Text, version);
                    }
                };
                cache_lock.push(&key, bytes.clone(), modified_time);
                bytes
            }
        };

        Self::new(content_type, version).set_body(content).to_owned()
    }

    /// 执行端点并构建响应。
    ///
    /// 处理器返回 `Err` 或发生 panic 时，状态码先被置为 500，再交由错误处理器生成正文；
    /// 错误处理器可以自行修改状态码。
    pub fn from_endpoint(
        request: &Request,
        endpoint: &Endpoint,
        path_variables: HashMap<String, String>,
        framework_error_handler: &ErrorHandler,
    ) -> Self {
        let id = request.id();
        let mut request = request.clone();
        request.set_path_variables(path_variables);
        let content_type = endpoint.content_type().clone();
        let mut response = Self::new(content_type.clone(), request.version());

        debug!("[ID{}]执行端点{}，请求路径{}", id, endpoint.route(), request.path());
        let result = catch_unwind(AssertUnwindSafe(|| endpoint.execute(&request, &mut response)))
            .unwrap_or_else(|panic| Err(panic_to_error(panic)));

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                warn!("[ID{}]端点{}执行失败: {}", id, endpoint.route(), e);
                response.set_status(500);
                match invoke_error_handler(endpoint.error_handler(), &e, &request, &mut response) {
                    Ok(value) => value,
                    Err(handler_error) => {
                        error!("[ID{}]错误处理器自身失败: {}", id, handler_error);
                        let mut fallback = Self::new(content_type.clone(), request.version());
                        fallback.set_status(500);
                        return match invoke_error_handler(
                            framework_error_handler,
                            &handler_error,
                            &request,
                            &mut fallback,
                        ) {
                            Ok(value) => {
                                let body = encode_result(&value, fallback.content_type());
                                fallback.set_body(body).to_owned()
                            }
                            Err(_) => Self::internal_error(content_type, request.version()),
                        };
                    }
                }
            }
        };

        // 处理器可能通过 response_mut 修改了内容类型，正文按最终的类型编码
        let body = encode_result(&value, response.content_type());
        response.set_body(body);
        response
    }

    /// 序列化为最终的报文字节
    pub fn data(&self) -> Vec<u8> {
        let version: &str = &self.version.to_string();
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let content_length: &str = &self.body.len().to_string();

        let header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            "Content-Type: ",
            self.content_type.mime(),
            CRLF,
            "Content-Length: ",
            content_length,
            CRLF,
            CRLF,
        ]
        .concat();
        let mut data = Vec::with_capacity(header.len() + self.body.len());
        data.extend_from_slice(header.as_bytes());
        data.extend_from_slice(&self.body);
        data
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// 按内容类型编码处理器返回值：结构化类型输出 JSON，其余类型输出原始文本。
pub fn encode_result(value: &Value, content_type: &ContentType) -> Bytes {
    if content_type.is_structured() {
        return Bytes::from(serde_json::to_vec(value).unwrap_or_default());
    }
    match value {
        Value::Null => Bytes::new(),
        Value::String(s) => Bytes::from(s.clone()),
        other => Bytes::from(other.to_string()),
    }
}

/// 以错误的 `source()` 链作为诊断追踪信息
pub fn diagnostic_trace(error: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}

fn invoke_error_handler(
    handler: &ErrorHandler,
    error: &HandlerError,
    request: &Request,
    response: &mut Response,
) -> Result<Value, HandlerError> {
    let trace = diagnostic_trace(&**error);
    let path_variables = request.path_variables().clone();
    catch_unwind(AssertUnwindSafe(|| {
        handler(error, &trace, request, response, &path_variables)
    }))
    .unwrap_or_else(|panic| Err(panic_to_error(panic)))
}

fn panic_to_error(panic: Box<dyn Any + Send>) -> HandlerError {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    message.into()
}
