// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 示例后端：`POST /register` 用账号密码换取令牌，`GET /test` 需要携带令牌访问。

use crate::{
    exception::Exception,
    framework::Framework,
    method::ParamSpec,
    request::Request,
    response::Response,
    security::{Authentication, Claims, JwtTokenAuth, JwtTokenFactory, KeyStore, TokenAuthenticator},
};

use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};

pub const BUSINESS_HOST: &str = "business_name.localhost";

pub struct UserDb {
    users: HashMap<String, String>,
}

impl UserDb {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl Default for UserDb {
    fn default() -> Self {
        Self::new(HashMap::from([("heknon".to_string(), "no".to_string())]))
    }
}

impl TokenAuthenticator for UserDb {
    fn authenticate(&self, _request: &Request, request_body: &Value) -> Authentication {
        let username = request_body["username"].as_str().unwrap_or_default().to_lowercase();
        let password = request_body["password"].as_str().unwrap_or_default();
        match self.users.get(&username) {
            Some(expected) if expected == password => Authentication::accept(Some(Value::String(username))),
            _ => Authentication::reject(None),
        }
    }

    fn token_data_builder(&self, _request: &Request, _request_body: &Value, builder_data: Option<Value>) -> Claims {
        let mut claims = Claims::new();
        claims.insert("username".to_string(), builder_data.unwrap_or(Value::Null));
        claims
    }
}

fn on_fail(_request: &Request, response: &mut Response, _data: Option<Value>) -> Value {
    response.set_status(401);
    Value::String("Unauthorized".to_string())
}

pub fn register_routes(
    framework: &mut Framework,
    key_store: Arc<KeyStore>,
    users: UserDb,
    token_expiration: i64,
) -> Result<(), Exception> {
    framework
        .post("/register")
        .decorate(
            JwtTokenFactory::new(users, key_store.clone())
                .named("TokenFactory")
                .expiration(token_expiration)
                .on_failure(on_fail),
        )
        .param(ParamSpec::decorator_result("token_factory_result", "TokenFactory"))
        .handle(|args| {
            Ok(json!({
                "token": args.get("token_factory_result").cloned().unwrap_or(Value::Null)
            }))
        })?;

    framework
        .get("/test")
        .match_header("Host", BUSINESS_HOST)
        .decorate(JwtTokenAuth::with_key_store(key_store).on_failure(on_fail))
        .param(ParamSpec::decorator_result("token", "JwtTokenAuth"))
        .handle(|args| Ok(args.get("token").cloned().unwrap_or(Value::Null)))?;

    Ok(())
}
