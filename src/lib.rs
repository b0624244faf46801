// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod backend;
pub mod cache;
pub mod config;
pub mod connection;
pub mod decorator;
pub mod exception;
pub mod framework;
pub mod method;
pub mod param;
pub mod request;
pub mod response;
pub mod route;
pub mod security;
pub mod server;
pub mod timer;

pub use cache::FileCache;
pub use config::Config;
pub use decorator::{Decorator, Evaluation};
pub use exception::{Exception, HandlerError};
pub use framework::{default_error_handler, Framework, RouteBuilder};
pub use method::{Arguments, ParamSpec, QueryKind};
pub use param::{ContentType, HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use route::{Endpoint, ErrorHandler, RouteMap};
pub use server::HttpServer;
