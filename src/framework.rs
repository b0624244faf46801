// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 框架入口
//!
//! [`Framework`] 持有路由表、静态文件目录和框架级错误处理器。
//! 所有路由都在服务器启动之前注册完毕，之后以 `Arc<Framework>` 只读共享。
//!
//! ```ignore
//! let mut framework = Framework::new("static", "index.html");
//! framework
//!     .get("/users/{id}")
//!     .param(ParamSpec::path_variable("id"))
//!     .handle(|args| Ok(json!({ "id": args.str("id") })))?;
//! ```

use crate::{
    cache::FileCache,
    config::Config,
    decorator::Decorator,
    exception::{Exception, HandlerError},
    method::{Arguments, Handler, Method, ParamSpec},
    param::{ContentType, HttpRequestMethod},
    request::Request,
    response::Response,
    route::{Endpoint, ErrorHandler, RouteMap},
};

use log::{debug, warn};
use serde_json::{json, Value};

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

const DEFAULT_CACHE_SIZE: usize = 5;

/// 框架级默认错误处理器：`{"error": 错误信息, "traceback": 诊断追踪}`
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|error, trace, _request, _response, _path_variables| {
        Ok(json!({
            "error": error.to_string(),
            "traceback": trace,
        }))
    })
}

pub struct Framework {
    routes: RouteMap,
    static_folder: PathBuf,
    static_url_path: String,
    error_handler: ErrorHandler,
    cache: Mutex<FileCache>,
}

impl Framework {
    /// `static_url_path` 是请求 `/` 时返回的静态文件（相对于静态目录）
    pub fn new(static_folder: impl Into<PathBuf>, static_url_path: &str) -> Self {
        Self {
            routes: RouteMap::new(),
            static_folder: static_folder.into(),
            static_url_path: static_url_path.trim_start_matches('/').to_string(),
            error_handler: default_error_handler(),
            cache: Mutex::new(FileCache::from_capacity(DEFAULT_CACHE_SIZE)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.www_root(), config.static_url_path()).with_cache_size(config.cache_size())
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache = Mutex::new(FileCache::from_capacity(cache_size));
        self
    }

    /// 替换框架级错误处理器。只影响此后注册的、没有自带错误处理器的端点。
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HandlerError, &str, &Request, &mut Response, &HashMap<String, String>) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    pub fn endpoint(&mut self, pattern: &str, methods: &[HttpRequestMethod]) -> RouteBuilder<'_> {
        RouteBuilder {
            framework: self,
            pattern: pattern.to_string(),
            methods: methods.to_vec(),
            content_type: ContentType::default(),
            match_headers: Vec::new(),
            error_handler: None,
            decorators: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn get_endpoint(&self, request: &Request) -> Option<(&Endpoint, HashMap<String, String>)> {
        self.routes
            .resolve(request.method(), request.route_path(), request.headers())
    }

    /// 未命中任何端点时对应的静态文件路径。含 `..` 的路径一律拒绝。
    pub fn static_path(&self, request: &Request) -> Option<PathBuf> {
        let route_path = request.route_path();
        let relative = match route_path {
            "/" => self.static_url_path.as_str(),
            _ => route_path.trim_start_matches('/'),
        };
        if relative.split(['/', '\\']).any(|segment| segment == "..") {
            return None;
        }
        Some(self.static_folder.join(relative))
    }

    pub fn respond(&self, request: &Request) -> Response {
        if let Some((endpoint, path_variables)) = self.get_endpoint(request) {
            return Response::from_endpoint(request, endpoint, path_variables, &self.error_handler);
        }

        debug!("[ID{}]{} {}没有匹配的端点，尝试静态文件", request.id(), request.method(), request.path());
        match self.static_path(request) {
            Some(path) => Response::from_file(request, &path, &self.cache),
            None => {
                warn!("[ID{}]请求的路径：{} 包含非法字符，返回404", request.id(), request.path());
                Response::not_found(request.version())
            }
        }
    }

    pub fn routes(&self) -> &RouteMap {
        &self.routes
    }

    pub fn static_folder(&self) -> &Path {
        &self.static_folder
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }
}

macro_rules! method_shorthands {
    ($($name:ident => $method:ident),* $(,)?) => {
        impl Framework {
            $(
                pub fn $name(&mut self, pattern: &str) -> RouteBuilder<'_> {
                    self.endpoint(pattern, &[HttpRequestMethod::$method])
                }
            )*
        }
    };
}

method_shorthands! {
    get => Get,
    post => Post,
    put => Put,
    patch => Patch,
    delete => Delete,
    copy => Copy,
    head => Head,
    options => Options,
    link => Link,
    unlink => Unlink,
    purge => Purge,
    lock => Lock,
    unlock => Unlock,
    propfind => Propfind,
    view => View,
}

/// 端点的链式注册器，以 [`RouteBuilder::handle`] 结束
pub struct RouteBuilder<'a> {
    framework: &'a mut Framework,
    pattern: String,
    methods: Vec<HttpRequestMethod>,
    content_type: ContentType,
    match_headers: Vec<(String, String)>,
    error_handler: Option<ErrorHandler>,
    decorators: Vec<Arc<dyn Decorator>>,
    params: Vec<ParamSpec>,
}

impl<'a> RouteBuilder<'a> {
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// 只有请求携带该标头且值完全相等时才匹配
    pub fn match_header(mut self, name: &str, value: &str) -> Self {
        self.match_headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HandlerError, &str, &Request, &mut Response, &HashMap<String, String>) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// 装饰器按添加顺序执行
    pub fn decorate<D: Decorator + 'static>(mut self, decorator: D) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// 多个端点共用同一个装饰器实例
    pub fn decorate_shared(mut self, decorator: Arc<dyn Decorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn handle<F>(self, handler: F) -> Result<(), Exception>
    where
        F: Fn(&mut Arguments<'_>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        if self.methods.is_empty() {
            return Err(Exception::NoMethods(self.pattern));
        }

        let handler: Handler = Arc::new(handler);
        let method = Method::new(self.params, handler);
        let error_handler = self
            .error_handler
            .unwrap_or_else(|| self.framework.error_handler.clone());

        for http_method in self.methods {
            let endpoint = Endpoint::new(
                &self.pattern,
                http_method,
                self.content_type.clone(),
                method.clone(),
                self.match_headers.clone(),
                self.decorators.clone(),
                error_handler.clone(),
            );
            debug!("注册端点{}", endpoint);
            self.framework.routes.add_route(endpoint)?;
        }
        Ok(())
    }
}
