// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 参数绑定模块
//!
//! 每个处理器在注册时声明一组参数规格（[`ParamSpec`]）。请求到来时，
//! 绑定器按声明顺序逐个运行提取器，产出交给处理器的 [`Arguments`]：
//!
//! | 提取器 | 取值来源 |
//! |---|---|
//! | `Request` / `Response` | 当前请求 / 响应对象本身 |
//! | `QueryParameter` | 查询字符串，按声明类型转换 |
//! | `PathVariable` | 路由匹配得到的路径变量 |
//! | `RequestBody` | 请求体（JSON 或原始文本） |
//! | `DecoratorResult` | 指定装饰器在前置检查中产出的结果 |
//!
//! 任何提取失败的参数，如果声明了默认值，则使用默认值。

use crate::{
    decorator::{parse_body, run_chain, ChainOutcome, Decorator},
    exception::HandlerError,
    request::Request,
    response::Response,
};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// 业务处理器
pub type Handler =
    Arc<dyn Fn(&mut Arguments<'_>) -> Result<Value, HandlerError> + Send + Sync>;

/// 查询参数的目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl QueryKind {
    fn convert(&self, raw: &str) -> Option<Value> {
        match self {
            QueryKind::String => Some(Value::String(raw.to_string())),
            QueryKind::Integer => raw.parse::<i64>().ok().map(Value::from),
            QueryKind::Float => raw.parse::<f64>().ok().map(Value::from),
            QueryKind::Boolean => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }
}

/// 请求体的解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// 必须是合法 JSON，否则视为无值
    Json,
    /// 按 UTF-8 文本原样交付
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extractor {
    Request,
    Response,
    QueryParameter { name: String, kind: QueryKind },
    PathVariable(String),
    RequestBody(BodyKind),
    DecoratorResult(String),
}

/// 处理器的一个形参声明
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    name: String,
    extractor: Extractor,
    default: Option<Value>,
}

impl ParamSpec {
    pub fn new(name: &str, extractor: Extractor) -> Self {
        Self {
            name: name.to_string(),
            extractor,
            default: None,
        }
    }

    pub fn request(name: &str) -> Self {
        Self::new(name, Extractor::Request)
    }

    pub fn response(name: &str) -> Self {
        Self::new(name, Extractor::Response)
    }

    /// 同名查询参数，按 `kind` 转换类型
    pub fn query(name: &str, kind: QueryKind) -> Self {
        Self::new(
            name,
            Extractor::QueryParameter {
                name: name.to_string(),
                kind,
            },
        )
    }

    pub fn path_variable(name: &str) -> Self {
        Self::new(name, Extractor::PathVariable(name.to_string()))
    }

    pub fn body(name: &str) -> Self {
        Self::new(name, Extractor::RequestBody(BodyKind::Json))
    }

    pub fn raw_body(name: &str) -> Self {
        Self::new(name, Extractor::RequestBody(BodyKind::Raw))
    }

    pub fn decorator_result(name: &str, decorator: &str) -> Self {
        Self::new(name, Extractor::DecoratorResult(decorator.to_string()))
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }
}

/// 绑定完成后交给处理器的实参集合
pub struct Arguments<'a> {
    request: &'a Request,
    response: &'a mut Response,
    values: HashMap<String, Value>,
    request_params: Vec<String>,
    response_params: Vec<String>,
}

impl<'a> Arguments<'a> {
    /// 当前请求。总是可用，与是否声明了 `Request` 参数无关。
    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut *self.response
    }

    /// 是否声明了某个名字的整请求/整响应参数
    pub fn is_request_param(&self, name: &str) -> bool {
        self.request_params.iter().any(|p| p == name)
    }

    pub fn is_response_param(&self, name: &str) -> bool {
        self.response_params.iter().any(|p| p == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    /// 反序列化为具体类型，缺失或类型不符时返回错误
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| format!("missing argument `{}`", name))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// 处理器及其参数规格，注册后不再变化
#[derive(Clone)]
pub struct Method {
    params: Vec<ParamSpec>,
    handler: Handler,
}

impl Method {
    pub fn new(params: Vec<ParamSpec>, handler: Handler) -> Self {
        Self { params, handler }
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// 运行装饰器链、绑定参数并调用处理器。
    ///
    /// 装饰器短路时直接返回 `on_fail` 的结果，处理器不会被调用。
    /// 装饰器写入的状态只存在于本次调用的请求副本上。
    pub fn execute(
        &self,
        request: &Request,
        response: &mut Response,
        decorators: &[Arc<dyn Decorator>],
    ) -> Result<Value, HandlerError> {
        if decorators.is_empty() {
            return self.invoke(request, response, &HashMap::new());
        }

        let mut request = request.clone();
        let request_body = parse_body(&request);
        match run_chain(decorators, &mut request, &request_body, response) {
            ChainOutcome::Proceed(results) => self.invoke(&request, response, &results),
            ChainOutcome::ShortCircuit(payload) => Ok(payload),
        }
    }

    fn invoke(
        &self,
        request: &Request,
        response: &mut Response,
        decorator_results: &HashMap<String, Value>,
    ) -> Result<Value, HandlerError> {
        let mut arguments = self.bind(request, response, decorator_results);
        debug!(
            "[ID{}]参数绑定完成：{:?}",
            arguments.request.id(),
            arguments.values.keys().collect::<Vec<_>>()
        );
        (self.handler)(&mut arguments)
    }

    fn bind<'a>(
        &self,
        request: &'a Request,
        response: &'a mut Response,
        decorator_results: &HashMap<String, Value>,
    ) -> Arguments<'a> {
        let mut values = HashMap::new();
        let mut request_params = Vec::new();
        let mut response_params = Vec::new();

        for spec in &self.params {
            let extracted = match &spec.extractor {
                Extractor::Request => {
                    request_params.push(spec.name.clone());
                    continue;
                }
                Extractor::Response => {
                    response_params.push(spec.name.clone());
                    continue;
                }
                Extractor::QueryParameter { name, kind } => request
                    .query_parameter(name)
                    .and_then(|raw| kind.convert(&raw)),
                Extractor::PathVariable(name) => request
                    .path_variable(name)
                    .map(|v| Value::String(v.to_string())),
                Extractor::RequestBody(kind) => extract_body(request, *kind),
                Extractor::DecoratorResult(decorator) => decorator_results.get(decorator).cloned(),
            };
            if let Some(value) = extracted.or_else(|| spec.default.clone()) {
                values.insert(spec.name.clone(), value);
            }
        }

        Arguments {
            request,
            response,
            values,
            request_params,
            response_params,
        }
    }
}

fn extract_body(request: &Request, kind: BodyKind) -> Option<Value> {
    let body = request.body();
    if body.is_empty() {
        return None;
    }
    match kind {
        BodyKind::Json => serde_json::from_slice(body).ok(),
        BodyKind::Raw => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
    }
}
