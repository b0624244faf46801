// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了框架遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 静态文件回退所用的 MIME 类型映射表。
//! - HTTP 方法、版本及内容类型的强类型枚举。

use lazy_static::lazy_static;
use std::{collections::HashMap, fmt, str::FromStr};

use crate::exception::Exception;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 请求头与请求体之间的分隔符
pub const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

/// 保持连接的默认超时时间（秒）
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 10;

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(204, "No Content");

        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(303, "See Other");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(410, "Gone");
        map.insert(411, "Length Required");
        map.insert(413, "Content Too Large");
        map.insert(414, "URI Too Long");
        map.insert(415, "Unsupported Media Type");
        map.insert(418, "I'm a teapot");
        map.insert(422, "Unprocessable Content");
        map.insert(429, "Too Many Requests");

        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 静态文件回退时用于决定响应的 `Content-Type`。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("css", "text/css;charset=utf-8");
        map.insert("csv", "text/csv");
        map.insert("gif", "image/gif");
        map.insert("htm", "text/html;charset=utf-8");
        map.insert("html", "text/html;charset=utf-8");
        map.insert("ico", "image/x-icon");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("map", "application/json");
        map.insert("mjs", "text/javascript");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("otf", "font/otf");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("ttf", "font/ttf");
        map.insert("txt", "text/plain");
        map.insert("wasm", "application/wasm");
        map.insert("webm", "video/webm");
        map.insert("webp", "image/webp");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("xml", "text/xml");
        map.insert("zip", "application/zip");
        // 兜底类型（通常用于无法识别后缀的二进制流）
        map.insert("_", "application/octet-stream");
        map
    };
}

/// 查询状态码对应的原因短语，未知状态码返回 `None`。
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    STATUS_CODES.get(&code).copied()
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

impl FromStr for HttpVersion {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HTTP/1.0" => Ok(HttpVersion::V1_0),
            "HTTP/1.1" => Ok(HttpVersion::V1_1),
            _ => Err(Exception::UnsupportedHttpVersion),
        }
    }
}

impl fmt::Display for HttpVersion {
    /// 格式化为状态行中使用的完整版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

/// 框架可识别的 HTTP 请求方法（含 WebDAV 等扩展方法）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Copy,
    Link,
    Unlink,
    Purge,
    Lock,
    Unlock,
    Propfind,
    View,
}

impl FromStr for HttpRequestMethod {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_uppercase().as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "POST" => HttpRequestMethod::Post,
            "PUT" => HttpRequestMethod::Put,
            "PATCH" => HttpRequestMethod::Patch,
            "DELETE" => HttpRequestMethod::Delete,
            "OPTIONS" => HttpRequestMethod::Options,
            "COPY" => HttpRequestMethod::Copy,
            "LINK" => HttpRequestMethod::Link,
            "UNLINK" => HttpRequestMethod::Unlink,
            "PURGE" => HttpRequestMethod::Purge,
            "LOCK" => HttpRequestMethod::Lock,
            "UNLOCK" => HttpRequestMethod::Unlock,
            "PROPFIND" => HttpRequestMethod::Propfind,
            "VIEW" => HttpRequestMethod::View,
            _ => return Err(Exception::UnSupportedRequestMethod),
        };
        Ok(method)
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Patch => "PATCH",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Copy => "COPY",
            HttpRequestMethod::Link => "LINK",
            HttpRequestMethod::Unlink => "UNLINK",
            HttpRequestMethod::Purge => "PURGE",
            HttpRequestMethod::Lock => "LOCK",
            HttpRequestMethod::Unlock => "UNLOCK",
            HttpRequestMethod::Propfind => "PROPFIND",
            HttpRequestMethod::View => "VIEW",
        };
        write!(f, "{}", name)
    }
}

/// 响应的内容类型标签。
///
/// `Json` 属于结构化类型，处理器返回值会经过 JSON 编码；其余类型按原始文本输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
    Html,
    /// 任意 MIME 字符串，静态文件回退时由扩展名决定
    Mime(String),
}

impl ContentType {
    /// 根据文件扩展名查表，未知扩展名使用 `application/octet-stream`
    pub fn from_extension(extension: &str) -> Self {
        let key = extension.to_lowercase();
        let mime = MIME_TYPES
            .get(key.as_str())
            .or_else(|| MIME_TYPES.get("_"))
            .copied()
            .unwrap_or("application/octet-stream");
        ContentType::Mime(mime.to_string())
    }

    pub fn mime(&self) -> &str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain;charset=utf-8",
            ContentType::Html => "text/html;charset=utf-8",
            ContentType::Mime(m) => m,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ContentType::Json)
    }
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::Json
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime())
    }
}
