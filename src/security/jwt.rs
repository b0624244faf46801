// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # JWT 装饰器
//!
//! - [`JwtTokenFactory`]：校验凭据并签发访问令牌，令牌字符串作为装饰器结果；
//! - [`JwtTokenAuth`]：从 `Authorization: Bearer <token>` 中取出令牌并校验。
//!
//! 业务相关的判断通过 [`TokenAuthenticator`] 与 [`TokenValidator`] 注入。

use super::key_pair::{Claims, KeyStore, TokenVerification};
use crate::{
    decorator::{Decorator, Evaluation},
    request::Request,
    response::Response,
};

use log::{debug, error};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_TOKEN_EXPIRATION: i64 = 60 * 30;

const BEARER_PREFIX: &str = "bearer ";

/// 校验失败时生成响应正文的回调
pub type OnFail = Arc<dyn Fn(&Request, &mut Response, Option<Value>) -> Value + Send + Sync>;

/// 默认行为：状态码 401，正文为空
pub fn unauthorized() -> OnFail {
    Arc::new(|_request, response, _data| {
        response.set_status(401);
        Value::Null
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Authentication {
    pub ok: bool,
    /// 失败时作为 `on_fail` 的附加数据
    pub auth_data: Option<Value>,
    /// 成功时传给 `token_data_builder`
    pub builder_data: Option<Value>,
}

impl Authentication {
    pub fn accept(builder_data: Option<Value>) -> Self {
        Self {
            ok: true,
            auth_data: None,
            builder_data,
        }
    }

    pub fn reject(auth_data: Option<Value>) -> Self {
        Self {
            ok: false,
            auth_data,
            builder_data: None,
        }
    }
}

pub trait TokenAuthenticator: Send + Sync {
    fn authenticate(&self, request: &Request, request_body: &Value) -> Authentication;

    fn token_data_builder(&self, request: &Request, request_body: &Value, builder_data: Option<Value>) -> Claims;
}

/// 令牌的签名与有效期已经校验通过之后，才会调用这里的方法
pub trait TokenValidator: Send + Sync {
    /// 业务层面的附加校验，`Err` 中的数据会交给 `on_fail`
    fn authenticate(&self, _request: &Request, _request_body: &Value, _claims: &Claims) -> Result<(), Option<Value>> {
        Ok(())
    }

    fn decoded_token_transformer(&self, _request: &Request, _request_body: &Value, claims: Claims) -> Value {
        Value::Object(claims)
    }
}

/// 只检查令牌本身是否有效
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsPresent;

impl TokenValidator for ClaimsPresent {}

pub struct JwtTokenFactory<A> {
    name: String,
    authenticator: A,
    key_store: Arc<KeyStore>,
    expiration_seconds: i64,
    on_fail: OnFail,
}

impl<A: TokenAuthenticator> JwtTokenFactory<A> {
    pub fn new(authenticator: A, key_store: Arc<KeyStore>) -> Self {
        Self {
            name: "JwtTokenFactory".to_string(),
            authenticator,
            key_store,
            expiration_seconds: DEFAULT_TOKEN_EXPIRATION,
            on_fail: unauthorized(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn expiration(mut self, seconds: i64) -> Self {
        self.expiration_seconds = seconds;
        self
    }

    pub fn on_failure<F>(mut self, on_fail: F) -> Self
    where
        F: Fn(&Request, &mut Response, Option<Value>) -> Value + Send + Sync + 'static,
    {
        self.on_fail = Arc::new(on_fail);
        self
    }
}

impl<A: TokenAuthenticator> Decorator for JwtTokenFactory<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_execute(&self, request: &Request, request_body: &Value) -> Evaluation {
        let authentication = self.authenticator.authenticate(request, request_body);
        if !authentication.ok {
            debug!("[ID{}]凭据校验未通过", request.id());
            return Evaluation::fail(authentication.auth_data);
        }

        let claims = self
            .authenticator
            .token_data_builder(request, request_body, authentication.builder_data);
        match self.key_store.create_access_token(claims, self.expiration_seconds) {
            Ok(token) => Evaluation::pass(Some(Value::String(token))),
            Err(e) => {
                error!("[ID{}]{}", request.id(), e);
                Evaluation::fail(None)
            }
        }
    }

    fn on_fail(&self, request: &Request, response: &mut Response, data: Option<Value>) -> Value {
        (self.on_fail)(request, response, data)
    }
}

pub struct JwtTokenAuth<V = ClaimsPresent> {
    name: String,
    validator: V,
    key_store: Arc<KeyStore>,
    on_fail: OnFail,
}

impl JwtTokenAuth<ClaimsPresent> {
    pub fn with_key_store(key_store: Arc<KeyStore>) -> Self {
        Self::new(ClaimsPresent, key_store)
    }
}

impl<V: TokenValidator> JwtTokenAuth<V> {
    pub fn new(validator: V, key_store: Arc<KeyStore>) -> Self {
        Self {
            name: "JwtTokenAuth".to_string(),
            validator,
            key_store,
            on_fail: unauthorized(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn on_failure<F>(mut self, on_fail: F) -> Self
    where
        F: Fn(&Request, &mut Response, Option<Value>) -> Value + Send + Sync + 'static,
    {
        self.on_fail = Arc::new(on_fail);
        self
    }

    fn verify_request(&self, request: &Request) -> TokenVerification {
        match request.header("authorization").and_then(bearer_token) {
            Some(token) => self.key_store.decode_access_token(token),
            None => TokenVerification::Invalid,
        }
    }
}

/// 去掉 `Bearer ` 前缀，方案名不区分大小写
fn bearer_token(header: &str) -> Option<&str> {
    let prefix = header.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = header[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

impl<V: TokenValidator> Decorator for JwtTokenAuth<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_execute(&self, request: &Request, request_body: &Value) -> Evaluation {
        let claims = match self.verify_request(request) {
            TokenVerification::Valid(claims) => claims,
            TokenVerification::Expired => {
                debug!("[ID{}]令牌已过期", request.id());
                return Evaluation::fail(Some(Value::String("token expired".to_string())));
            }
            TokenVerification::Invalid => {
                debug!("[ID{}]令牌无效或缺失", request.id());
                return Evaluation::fail(Some(Value::String("invalid token".to_string())));
            }
        };

        if let Err(data) = self.validator.authenticate(request, request_body, &claims) {
            debug!("[ID{}]令牌未通过业务校验", request.id());
            return Evaluation::fail(data);
        }
        Evaluation::pass(Some(
            self.validator
                .decoded_token_transformer(request, request_body, claims),
        ))
    }

    fn on_fail(&self, request: &Request, response: &mut Response, data: Option<Value>) -> Value {
        (self.on_fail)(request, response, data)
    }
}
