// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责将分帧器交付的原始字节解析为强类型的 `Request` 结构体。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 全部 HTTP 标头（Headers）的提取，键名统一转为小写。
//! 3. 查询字符串、路径变量与请求级状态的访问。
//! 4. `Connection` / `Keep-Alive` 标头的语义解析。

use crate::{exception::Exception, param::*};
use bytes::Bytes;
use log::error;
use serde_json::Value;
use std::{collections::HashMap, time::Duration};

/// 表示一个完整的 HTTP 请求。
///
/// 请求体组装完成后即视为不可变；路径变量在路由匹配后附加到请求的副本上。
#[derive(Debug, Clone)]
pub struct Request {
    /// 连接内的请求 ID，用于日志追踪
    id: u128,
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// 请求的资源路径（包含查询字符串）
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 请求标头，键名为小写
    headers: HashMap<String, String>,
    /// 请求体原始字节
    body: Bytes,
    /// 路由匹配后提取出的路径变量
    path_variables: HashMap<String, String>,
    /// 不透明的请求级状态，供装饰器与处理器之间传递数据
    state: HashMap<String, Value>,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 定位头部与正文之间的空行分隔符（缺失时整段视为头部）。
    /// 2. 验证编码：确保头部是合法的 UTF-8 字符串。
    /// 3. 解析请求行：严格要求 `方法 路径 版本` 三段式。
    /// 4. 逐行解析标头，任何一行格式非法即返回错误，而不是猜测。
    /// 5. 分隔符之后已经到达的字节作为初始请求体。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let (head, body) = match find_header_end(buffer) {
            Some(end) => (&buffer[..end], &buffer[end + HEADER_SEPARATOR.len()..]),
            None => (buffer, &buffer[buffer.len()..]),
        };

        let head = match std::str::from_utf8(head) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or("");
        let (method, path, version) = parse_request_line(request_line).map_err(|e| {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            e
        })?;

        let mut headers: HashMap<String, String> = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = parse_header_line(line).map_err(|e| {
                error!("[ID{}]HTTP请求头格式不正确：{}", id, line);
                e
            })?;
            headers
                .entry(name)
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        Ok(Self {
            id,
            method,
            path,
            version,
            headers,
            body: Bytes::copy_from_slice(body),
            path_variables: HashMap::new(),
            state: HashMap::new(),
        })
    }
}

/// 返回 `\r\n\r\n` 分隔符的起始位置
pub fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_SEPARATOR.len())
        .position(|window| window == HEADER_SEPARATOR)
}

fn parse_request_line(line: &str) -> Result<(HttpRequestMethod, String, HttpVersion), Exception> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(Exception::MalformedRequestLine);
    }
    let method = parts[0].parse::<HttpRequestMethod>()?;
    let path = parts[1];
    if !path.starts_with('/') && path != "*" {
        return Err(Exception::MalformedRequestLine);
    }
    let version = parts[2].parse::<HttpVersion>()?;
    Ok((method, path.to_string(), version))
}

fn parse_header_line(line: &str) -> Result<(String, String), Exception> {
    let (name, value) = line.split_once(':').ok_or(Exception::MalformedHeader)?;
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Exception::MalformedHeader);
    }
    Ok((name.to_lowercase(), value.trim().to_string()))
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn id(&self) -> u128 {
        self.id
    }

    /// 获取 HTTP 协议版本
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取去掉查询字符串后的路径，用于路由匹配
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    pub fn query_string(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }

    /// 获取解码后的查询参数，同名参数取第一个
    pub fn query_parameter(&self, name: &str) -> Option<String> {
        self.query_string()?
            .split('&')
            .filter(|pair| !pair.is_empty())
            .find_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                if decode_component(key) == name {
                    Some(decode_component(value))
                } else {
                    None
                }
            })
    }

    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// 按名称获取标头，大小写不敏感
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|v| v.as_str())
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    /// 声明的请求体长度；缺失或无法解析时为 `None`
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")?.trim().parse().ok()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 由分帧器在请求体接收完整后调用
    pub fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    pub fn path_variables(&self) -> &HashMap<String, String> {
        &self.path_variables
    }

    pub fn path_variable(&self, name: &str) -> Option<&str> {
        self.path_variables.get(name).map(|v| v.as_str())
    }

    pub fn set_path_variables(&mut self, variables: HashMap<String, String>) {
        self.path_variables = variables;
    }

    pub fn state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn insert_state(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
    }

    /// 客户端是否通过 `Connection: keep-alive` 请求保持连接
    pub fn keep_alive(&self) -> bool {
        self.header("connection").map_or(false, |v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("keep-alive"))
        })
    }

    /// 解析 `Keep-Alive: timeout=<秒>` 中的超时参数。`timeout=0` 视为未指定。
    pub fn keep_alive_timeout(&self) -> Option<Duration> {
        self.header("keep-alive")?.split(',').find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("timeout") {
                match value.trim().parse::<u64>() {
                    Ok(0) | Err(_) => None,
                    Ok(seconds) => Some(Duration::from_secs(seconds)),
                }
            } else {
                None
            }
        })
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path 和 Headers
    #[test]
    fn test_parse_get_request() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), HttpVersion::V1_1);
        assert_eq!(request.user_agent(), "Test-Browser");
        assert_eq!(request.header("host"), Some("localhost:7878"));
        assert!(request.body().is_empty());
    }

    /// POST 请求中分隔符之后已到达的字节作为初始请求体
    #[test]
    fn test_parse_post_request_with_body() {
        let request_str =
            "POST /submit HTTP/1.1\r\nHost: localhost:7878\r\nContent-Length: 10\r\n\r\ntest=value";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Post);
        assert_eq!(request.path(), "/submit");
        assert_eq!(request.content_length(), Some(10));
        assert_eq!(request.body().as_ref(), b"test=value");
    }

    #[test]
    fn test_extended_methods() {
        for (raw, method) in [
            ("PUT", HttpRequestMethod::Put),
            ("DELETE", HttpRequestMethod::Delete),
            ("PURGE", HttpRequestMethod::Purge),
        ] {
            let request_str = format!("{} /resource HTTP/1.1\r\n\r\n", raw);
            let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
            assert_eq!(request.method(), method);
        }
    }

    #[test]
    fn test_unsupported_method() {
        let request_str = "BREW /pot HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes(), 0);
        assert!(matches!(result, Err(Exception::UnSupportedRequestMethod)));
    }

    #[test]
    fn test_unsupported_http_version() {
        let request_str = "GET / HTTP/2.0\r\nHost: localhost:7878\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes(), 0);
        assert!(matches!(result, Err(Exception::UnsupportedHttpVersion)));
    }

    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];
        let result = Request::try_from(&buffer, 0);
        assert!(matches!(result, Err(Exception::RequestIsNotUtf8)));
    }

    /// 正文部分允许是任意二进制数据
    #[test]
    fn test_binary_body_is_allowed() {
        let mut buffer = b"POST /upload HTTP/1.1\r\nContent-Length: 3\r\n\r\n".to_vec();
        buffer.extend_from_slice(&[0xFF, 0x00, 0xFE]);
        let request = Request::try_from(&buffer, 0).unwrap();
        assert_eq!(request.body().as_ref(), &[0xFF, 0x00, 0xFE]);
    }

    #[test]
    fn test_malformed_request_line() {
        for raw in [
            "GET /\r\n\r\n",
            "GET  / HTTP/1.1\r\n\r\n",
            "GET / HTTP/1.1 extra\r\n\r\n",
            "GET index.html HTTP/1.1\r\n\r\n",
            "\r\n\r\n",
        ] {
            let result = Request::try_from(raw.as_bytes(), 0);
            assert!(
                matches!(result, Err(Exception::MalformedRequestLine)),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_malformed_header() {
        for raw in [
            "GET / HTTP/1.1\r\nNoColonHere\r\n\r\n",
            "GET / HTTP/1.1\r\n: value\r\n\r\n",
            "GET / HTTP/1.1\r\nBad Name: value\r\n\r\n",
        ] {
            let result = Request::try_from(raw.as_bytes(), 0);
            assert!(matches!(result, Err(Exception::MalformedHeader)), "{:?}", raw);
        }
    }

    /// 验证 Header 字段名是否大小写不敏感
    #[test]
    fn test_case_insensitive_headers() {
        let request_str = "GET / HTTP/1.1\r\nHOST: example.com\r\nuser-agent: Test\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.header("Host"), Some("example.com"));
        assert_eq!(request.user_agent(), "Test");
        assert!(request.headers().contains_key("host"));
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let request_str = "GET / HTTP/1.1\r\nAccept: text/html\r\nAccept: application/json\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
        assert_eq!(request.header("accept"), Some("text/html, application/json"));
    }

    /// 确保带查询参数的路径能完整提取，并可按名称解码
    #[test]
    fn test_path_with_query_string() {
        let request_str = "GET /page?id=123&name=hello%20world&q=a+b HTTP/1.1\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.path(), "/page?id=123&name=hello%20world&q=a+b");
        assert_eq!(request.route_path(), "/page");
        assert_eq!(request.query_parameter("id").as_deref(), Some("123"));
        assert_eq!(request.query_parameter("name").as_deref(), Some("hello world"));
        assert_eq!(request.query_parameter("q").as_deref(), Some("a b"));
        assert_eq!(request.query_parameter("missing"), None);
    }

    #[test]
    fn test_unparsable_content_length() {
        let request_str = "POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
        assert_eq!(request.content_length(), None);
    }

    #[test]
    fn test_keep_alive_headers() {
        let request_str =
            "GET / HTTP/1.1\r\nConnection: Keep-Alive\r\nKeep-Alive: timeout=5, max=100\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
        assert!(request.keep_alive());
        assert_eq!(request.keep_alive_timeout(), Some(Duration::from_secs(5)));

        let request_str = "GET / HTTP/1.1\r\nConnection: close\r\nKeep-Alive: timeout=abc\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
        assert!(!request.keep_alive());
        assert_eq!(request.keep_alive_timeout(), None);

        let request_str = "GET / HTTP/1.1\r\nConnection: keep-alive\r\nKeep-Alive: timeout=0\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
        assert!(request.keep_alive());
        assert_eq!(request.keep_alive_timeout(), None);
    }

    #[test]
    fn test_lowercase_method() {
        let request_str = "get / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Get);
    }

    #[test]
    fn test_find_header_end() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\nbody"), Some(14));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r"), None);
    }
}
