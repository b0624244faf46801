// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 端点：一条 (方法, 路径模式, 标头断言) → 处理器 的注册记录。

use crate::{
    decorator::Decorator,
    exception::HandlerError,
    method::Method,
    param::{ContentType, HttpRequestMethod},
    request::Request,
    response::Response,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// 错误处理器：(错误, 诊断追踪, 请求, 响应, 路径变量) → 响应正文
pub type ErrorHandler = Arc<
    dyn Fn(&HandlerError, &str, &Request, &mut Response, &HashMap<String, String>) -> Result<Value, HandlerError>
        + Send
        + Sync,
>;

lazy_static! {
    static ref VARIABLE_MATCHER: Regex = Regex::new(r"^\{([^{}/]+)\}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// 把路径补齐为以 `/` 开头并以 `/` 结尾的形式，空路径视为 `/`
pub fn normalize(route: &str) -> String {
    let mut normalized = String::with_capacity(route.len() + 2);
    if !route.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(route);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Clone)]
pub struct Endpoint {
    route: String,
    http_method: HttpRequestMethod,
    content_type: ContentType,
    match_headers: Vec<(String, String)>,
    decorators: Vec<Arc<dyn Decorator>>,
    method: Method,
    error_handler: ErrorHandler,
    segments: Vec<Segment>,
    has_variables: bool,
}

impl Endpoint {
    pub fn new(
        route: &str,
        http_method: HttpRequestMethod,
        content_type: ContentType,
        method: Method,
        match_headers: Vec<(String, String)>,
        decorators: Vec<Arc<dyn Decorator>>,
        error_handler: ErrorHandler,
    ) -> Self {
        let route = normalize(route);
        let segments: Vec<Segment> = split_segments(&route)
            .map(|segment| match VARIABLE_MATCHER.captures(segment) {
                Some(caps) => Segment::Variable(caps[1].to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        let has_variables = segments.iter().any(|s| matches!(s, Segment::Variable(_)));
        let match_headers = match_headers
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();

        Self {
            route,
            http_method,
            content_type,
            match_headers,
            decorators,
            method,
            error_handler,
            segments,
            has_variables,
        }
    }

    /// 标头断言：每个断言键都必须存在且值完全相等；没有断言时总是匹配
    pub fn matches_headers(&self, headers: &HashMap<String, String>) -> bool {
        self.match_headers
            .iter()
            .all(|(name, value)| headers.get(name) == Some(value))
    }

    /// 路径匹配，成功时返回绑定好的路径变量
    pub fn matches_url(&self, url: &str) -> Option<HashMap<String, String>> {
        if !self.has_variables {
            return (normalize(url) == self.route).then(HashMap::new);
        }

        let url_segments: Vec<&str> = split_segments(url).collect();
        if url_segments.len() != self.segments.len() {
            return None;
        }

        let mut variables = HashMap::new();
        for (url_segment, segment) in url_segments.iter().zip(&self.segments) {
            match segment {
                Segment::Literal(literal) if literal != url_segment => return None,
                Segment::Literal(_) => {}
                Segment::Variable(name) => {
                    variables.insert(name.clone(), url_segment.to_string());
                }
            }
        }
        Some(variables)
    }

    pub fn execute(&self, request: &Request, response: &mut Response) -> Result<Value, HandlerError> {
        self.method.execute(request, response, &self.decorators)
    }

    pub fn has_route_variables(&self) -> bool {
        self.has_variables
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.http_method
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }

    pub fn decorators(&self) -> &[Arc<dyn Decorator>] {
        &self.decorators
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({} {})", self.http_method, self.route)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("route", &self.route)
            .field("method", &self.http_method)
            .field("content_type", &self.content_type)
            .field("match_headers", &self.match_headers)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
