// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了框架在启动配置、连接分帧与请求解析阶段可能出现的各类异常。
//!
//! ## 设计意图
//! - **错误分类**：涵盖协议解析错误、连接分帧错误、路由注册错误、配置与密钥加载错误。
//! - **语义映射**：分帧/解析类错误意味着直接断开连接；注册类错误只会在启动阶段出现。
//! - **用户友好**：通过实现 `std::fmt::Display`，错误信息可以被安全地记录到日志中。
//!
//! 处理器（handler）自身的失败不使用本枚举，而是使用 [`HandlerError`]，
//! 以便业务代码返回任意错误类型。

use std::fmt;

/// 业务处理器与错误处理器返回的错误类型。
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// 框架运行过程中发生的异常类型。
#[derive(Debug)]
pub enum Exception {
    /// 请求头部分无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行格式不正确（不是 `方法 路径 版本` 三段式）。
    MalformedRequestLine,
    /// 某个请求头不是 `Name: value` 形式。
    MalformedHeader,
    /// 客户端使用了框架无法识别的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了不支持的 HTTP 协议版本（例如 HTTP/2.0）。
    UnsupportedHttpVersion,
    /// 请求头在超过上限之前仍未出现空行分隔符。
    HeaderTooLarge,
    /// 请求体尚未接收完整时对端关闭了连接。
    UnexpectedEof,
    /// 同一 (方法, 路径) 被重复注册。属于配置错误，仅在启动阶段出现。
    RouteAlreadyExists(String),
    /// 路由注册时没有给出任何 HTTP 方法。
    NoMethods(String),
    /// 配置文件读取或反序列化失败。
    Config(String),
    /// 签名密钥无法加载（例如 PEM 格式错误）。
    InvalidKey(String),
    /// 底层 Socket I/O 错误。
    Io(std::io::Error),
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            MalformedHeader => write!(f, "Malformed request header"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            HeaderTooLarge => write!(f, "Request header too large"),
            UnexpectedEof => write!(f, "Connection closed before the request body was complete"),
            RouteAlreadyExists(route) => write!(f, "Route already exists: {}", route),
            NoMethods(route) => write!(f, "No HTTP method given for route {}", route),
            Config(msg) => write!(f, "Invalid configuration: {}", msg),
            InvalidKey(msg) => write!(f, "Invalid signing key: {}", msg),
            Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Exception {
    fn from(e: std::io::Error) -> Self {
        Io(e)
    }
}

impl Exception {
    /// 是否属于请求报文本身的协议错误（而非传输层错误）。
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            RequestIsNotUtf8
                | MalformedRequestLine
                | MalformedHeader
                | UnSupportedRequestMethod
                | UnsupportedHttpVersion
                | HeaderTooLarge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_route_exists() {
        let e = Exception::RouteAlreadyExists("GET /users/".to_string());
        assert_eq!(e.to_string(), "Route already exists: GET /users/");
    }

    #[test]
    fn test_protocol_error_classification() {
        assert!(Exception::MalformedHeader.is_protocol_error());
        assert!(Exception::HeaderTooLarge.is_protocol_error());
        assert!(!Exception::UnexpectedEof.is_protocol_error());
        let io = Exception::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!io.is_protocol_error());
        assert!(std::error::Error::source(&io).is_some());
    }
}
