// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 装饰器（前置检查）模块
//!
//! 装饰器挂载在端点上，在处理器执行之前依次运行。每个装饰器都可以：
//! - 放行，并产出一个结果供参数绑定使用（按装饰器名称索引）；
//! - 拒绝，此时调用其 `on_fail` 生成响应正文，整个请求就此短路。
//!
//! 放行时还可以通过 [`Evaluation::with_state`] 给请求附加状态，
//! 处理器经由 `Request::state` 读取。
//!
//! 执行顺序即注册顺序：先声明的先执行。

use crate::{request::Request, response::Response};
use log::debug;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// `should_execute` 的返回值
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// 是否允许继续执行
    pub proceed: bool,
    /// 放行时产出的结果
    pub result: Option<Value>,
    /// 失败时传给 `on_fail` 的附加数据
    pub failure: Option<Value>,
    /// 放行后写入请求的状态
    pub state: HashMap<String, Value>,
}

impl Evaluation {
    pub fn pass(result: Option<Value>) -> Self {
        Self {
            proceed: true,
            result,
            failure: None,
            state: HashMap::new(),
        }
    }

    pub fn fail(failure: Option<Value>) -> Self {
        Self {
            proceed: false,
            result: None,
            failure,
            state: HashMap::new(),
        }
    }

    pub fn with_state(mut self, key: &str, value: Value) -> Self {
        self.state.insert(key.to_string(), value);
        self
    }
}

/// 单个装饰器的最终裁决
#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorOutcome {
    Proceed(Option<Value>),
    ShortCircuit(Value),
}

/// 整条装饰器链的裁决
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// 全部放行，附带各装饰器的非空结果（键为装饰器名称）
    Proceed(HashMap<String, Value>),
    ShortCircuit(Value),
}

pub trait Decorator: Send + Sync {
    /// 装饰器的标识，参数绑定通过它取回结果
    fn name(&self) -> &str;

    /// 放行但结果为空时是否视为失败
    fn fail_on_null_result(&self) -> bool {
        true
    }

    fn should_execute(&self, request: &Request, request_body: &Value) -> Evaluation;

    fn on_fail(&self, request: &Request, response: &mut Response, data: Option<Value>) -> Value;

    /// 放行时把 `Evaluation::state` 写入请求，拒绝时请求保持不变
    fn evaluate(&self, request: &mut Request, request_body: &Value, response: &mut Response) -> DecoratorOutcome {
        let evaluation = self.should_execute(request, request_body);
        if !evaluation.proceed {
            debug!("[ID{}]装饰器{}拒绝了请求，调用on_fail", request.id(), self.name());
            return DecoratorOutcome::ShortCircuit(self.on_fail(request, response, evaluation.failure));
        }
        let result = match evaluation.result {
            Some(result) if !result.is_null() => Some(result),
            _ if self.fail_on_null_result() => {
                debug!(
                    "[ID{}]装饰器{}返回空结果且设置了fail_on_null_result，调用on_fail",
                    request.id(),
                    self.name()
                );
                return DecoratorOutcome::ShortCircuit(self.on_fail(request, response, evaluation.failure));
            }
            _ => None,
        };
        for (key, value) in evaluation.state {
            request.insert_state(&key, value);
        }
        DecoratorOutcome::Proceed(result)
    }
}

/// 按注册顺序运行装饰器链。请求体只解析一次，由调用方传入。
pub fn run_chain(
    decorators: &[Arc<dyn Decorator>],
    request: &mut Request,
    request_body: &Value,
    response: &mut Response,
) -> ChainOutcome {
    let mut results = HashMap::new();
    for decorator in decorators {
        match decorator.evaluate(request, request_body, response) {
            DecoratorOutcome::ShortCircuit(payload) => return ChainOutcome::ShortCircuit(payload),
            DecoratorOutcome::Proceed(Some(result)) => {
                results.insert(decorator.name().to_string(), result);
            }
            DecoratorOutcome::Proceed(None) => {}
        }
    }
    ChainOutcome::Proceed(results)
}

/// 请求体的通用解析：能解析为 JSON 就用 JSON，否则按 UTF-8 文本，空请求体为 `Null`
pub fn parse_body(request: &Request) -> Value {
    let body = request.body();
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ContentType, HttpVersion};
    use mockall::{mock, predicate::*, Sequence};
    use serde_json::json;

    mock! {
        pub Check {}
        impl Decorator for Check {
            fn name(&self) -> &str;
            fn fail_on_null_result(&self) -> bool;
            fn should_execute(&self, request: &Request, request_body: &Value) -> Evaluation;
            fn on_fail(&self, request: &Request, response: &mut Response, data: Option<Value>) -> Value;
        }
    }

    fn request(raw: &str) -> Request {
        Request::try_from(raw.as_bytes(), 0).unwrap()
    }

    fn response() -> Response {
        Response::new(ContentType::Json, HttpVersion::V1_1)
    }

    #[test]
    fn test_chain_records_results_by_name() {
        let mut first = MockCheck::new();
        first.expect_name().return_const("first".to_string());
        first.expect_fail_on_null_result().return_const(true);
        first
            .expect_should_execute()
            .times(1)
            .returning(|_, _| Evaluation::pass(Some(json!("user-1"))));
        first.expect_on_fail().never();

        let mut second = MockCheck::new();
        second.expect_name().return_const("second".to_string());
        second.expect_fail_on_null_result().return_const(false);
        second
            .expect_should_execute()
            .times(1)
            .returning(|_, _| Evaluation::pass(None));
        second.expect_on_fail().never();

        let chain: Vec<Arc<dyn Decorator>> = vec![Arc::new(first), Arc::new(second)];
        let mut req = request("GET / HTTP/1.1\r\n\r\n");
        let outcome = run_chain(&chain, &mut req, &Value::Null, &mut response());

        let mut expected = HashMap::new();
        expected.insert("first".to_string(), json!("user-1"));
        assert_eq!(outcome, ChainOutcome::Proceed(expected));
    }

    #[test]
    fn test_rejection_short_circuits_remaining_decorators() {
        let mut seq = Sequence::new();
        let mut first = MockCheck::new();
        first.expect_name().return_const("first".to_string());
        first
            .expect_should_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Evaluation::fail(Some(json!("bad credentials"))));
        first
            .expect_on_fail()
            .with(always(), always(), eq(Some(json!("bad credentials"))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, response, _| {
                response.set_status(401);
                json!("Unauthorized")
            });

        let mut second = MockCheck::new();
        second.expect_name().return_const("second".to_string());
        second.expect_should_execute().never();

        let chain: Vec<Arc<dyn Decorator>> = vec![Arc::new(first), Arc::new(second)];
        let mut req = request("GET / HTTP/1.1\r\n\r\n");
        let mut resp = response();
        let outcome = run_chain(&chain, &mut req, &Value::Null, &mut resp);

        assert_eq!(outcome, ChainOutcome::ShortCircuit(json!("Unauthorized")));
        assert_eq!(resp.status_code(), 401);
    }

    #[test]
    fn test_null_result_fails_when_policy_set() {
        let mut check = MockCheck::new();
        check.expect_name().return_const("check".to_string());
        check.expect_fail_on_null_result().return_const(true);
        check
            .expect_should_execute()
            .returning(|_, _| Evaluation::pass(Some(Value::Null)));
        check.expect_on_fail().times(1).returning(|_, _, _| json!("no result"));

        let mut req = request("GET / HTTP/1.1\r\n\r\n");
        let outcome = check.evaluate(&mut req, &Value::Null, &mut response());
        assert_eq!(outcome, DecoratorOutcome::ShortCircuit(json!("no result")));
    }

    #[test]
    fn test_state_written_only_when_chain_proceeds() {
        let mut tenant = MockCheck::new();
        tenant.expect_name().return_const("tenant".to_string());
        tenant.expect_fail_on_null_result().return_const(false);
        tenant
            .expect_should_execute()
            .returning(|_, _| Evaluation::pass(None).with_state("tenant", json!("acme")));

        let mut req = request("GET / HTTP/1.1\r\n\r\n");
        let outcome = tenant.evaluate(&mut req, &Value::Null, &mut response());
        assert_eq!(outcome, DecoratorOutcome::Proceed(None));
        assert_eq!(req.state("tenant"), Some(&json!("acme")));

        let mut deny = MockCheck::new();
        deny.expect_name().return_const("deny".to_string());
        deny.expect_should_execute()
            .returning(|_, _| Evaluation::fail(None).with_state("leaked", json!(true)));
        deny.expect_on_fail().returning(|_, _, _| json!("denied"));

        let mut req = request("GET / HTTP/1.1\r\n\r\n");
        let outcome = deny.evaluate(&mut req, &Value::Null, &mut response());
        assert_eq!(outcome, DecoratorOutcome::ShortCircuit(json!("denied")));
        assert_eq!(req.state("leaked"), None);
    }

    #[test]
    fn test_parse_body() {
        let json_req = request("POST / HTTP/1.1\r\n\r\n{\"username\":\"heknon\"}");
        assert_eq!(parse_body(&json_req), json!({"username": "heknon"}));

        let text_req = request("POST / HTTP/1.1\r\n\r\nusername=heknon");
        assert_eq!(parse_body(&text_req), json!("username=heknon"));

        let empty = request("POST / HTTP/1.1\r\n\r\n");
        assert_eq!(parse_body(&empty), Value::Null);
    }
}
