// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 路由表：方法 → (精确路径 → 端点)。
//!
//! 启动阶段填充，开始服务后只读，因此查找不需要任何锁。
//! 多个带变量的模式同时匹配同一 URL 时，先注册者胜出。

use super::endpoint::{normalize, Endpoint};
use crate::{exception::Exception, param::HttpRequestMethod};
use std::collections::HashMap;

#[derive(Default)]
struct MethodRoutes {
    exact: HashMap<String, usize>,
    endpoints: Vec<Endpoint>,
}

#[derive(Default)]
pub struct RouteMap {
    routes: HashMap<HttpRequestMethod, MethodRoutes>,
}

impl RouteMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, endpoint: Endpoint) -> Result<(), Exception> {
        let routes = self.routes.entry(endpoint.method()).or_default();
        if routes.exact.contains_key(endpoint.route()) {
            return Err(Exception::RouteAlreadyExists(format!(
                "{} {}",
                endpoint.method(),
                endpoint.route()
            )));
        }
        routes
            .exact
            .insert(endpoint.route().to_string(), routes.endpoints.len());
        routes.endpoints.push(endpoint);
        Ok(())
    }

    /// 查找端点。先做 O(1) 的精确匹配，再按注册顺序扫描带变量的模式。
    pub fn resolve(
        &self,
        method: HttpRequestMethod,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Option<(&Endpoint, HashMap<String, String>)> {
        let routes = self.routes.get(&method)?;

        if let Some(&index) = routes.exact.get(&normalize(path)) {
            let endpoint = &routes.endpoints[index];
            if !endpoint.has_route_variables() && endpoint.matches_headers(headers) {
                return Some((endpoint, HashMap::new()));
            }
        }

        routes
            .endpoints
            .iter()
            .filter(|endpoint| endpoint.has_route_variables())
            .find_map(|endpoint| {
                let variables = endpoint.matches_url(path)?;
                endpoint
                    .matches_headers(headers)
                    .then_some((endpoint, variables))
            })
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(|r| r.endpoints.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::endpoint::tests::endpoint;
    use proptest::prelude::*;

    fn no_headers() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut map = RouteMap::new();
        map.add_route(endpoint("/users", &[])).unwrap();
        let err = map.add_route(endpoint("users/", &[])).unwrap_err();
        assert!(matches!(err, Exception::RouteAlreadyExists(ref r) if r == "GET /users/"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_path_variable_resolution() {
        let mut map = RouteMap::new();
        map.add_route(endpoint("/users/{id}/", &[])).unwrap();

        let (found, vars) = map.resolve(HttpRequestMethod::Get, "/users/42", &no_headers()).unwrap();
        assert_eq!(found.route(), "/users/{id}/");
        assert_eq!(vars.get("id").map(String::as_str), Some("42"));

        assert!(map.resolve(HttpRequestMethod::Get, "/users/42/extra", &no_headers()).is_none());
        assert!(map.resolve(HttpRequestMethod::Post, "/users/42", &no_headers()).is_none());
    }

    #[test]
    fn test_exact_match_preferred_over_variables() {
        let mut map = RouteMap::new();
        map.add_route(endpoint("/users/{id}", &[])).unwrap();
        map.add_route(endpoint("/users/me", &[])).unwrap();

        let (found, vars) = map.resolve(HttpRequestMethod::Get, "/users/me", &no_headers()).unwrap();
        assert_eq!(found.route(), "/users/me/");
        assert!(vars.is_empty());

        let (found, vars) = map.resolve(HttpRequestMethod::Get, "/users/{id}", &no_headers()).unwrap();
        assert_eq!(found.route(), "/users/{id}/");
        assert_eq!(vars.get("id").map(String::as_str), Some("{id}"));
    }

    #[test]
    fn test_first_registered_variable_pattern_wins() {
        let mut map = RouteMap::new();
        map.add_route(endpoint("/files/{name}", &[])).unwrap();
        map.add_route(endpoint("/{kind}/{name}", &[])).unwrap();

        let (found, _) = map.resolve(HttpRequestMethod::Get, "/files/a.txt", &no_headers()).unwrap();
        assert_eq!(found.route(), "/files/{name}/");
        let (found, vars) = map.resolve(HttpRequestMethod::Get, "/docs/a.txt", &no_headers()).unwrap();
        assert_eq!(found.route(), "/{kind}/{name}/");
        assert_eq!(vars.get("kind").map(String::as_str), Some("docs"));
    }

    #[test]
    fn test_header_predicate_blocks_match() {
        let mut map = RouteMap::new();
        map.add_route(endpoint("/test", &[("Host", "business_name.localhost")])).unwrap();

        assert!(map.resolve(HttpRequestMethod::Get, "/test", &no_headers()).is_none());

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "localhost:8080".to_string());
        assert!(map.resolve(HttpRequestMethod::Get, "/test", &headers).is_none());

        headers.insert("host".to_string(), "business_name.localhost".to_string());
        assert!(map.resolve(HttpRequestMethod::Get, "/test", &headers).is_some());
    }

    proptest! {
        #[test]
        fn prop_variable_binds_any_segment(id in "[A-Za-z0-9_.~-]{1,16}") {
            let mut map = RouteMap::new();
            map.add_route(endpoint("/users/{id}/", &[])).unwrap();
            let path = format!("/users/{}", id);
            let (_, vars) = map.resolve(HttpRequestMethod::Get, &path, &no_headers()).unwrap();
            prop_assert_eq!(vars.get("id"), Some(&id));

            let longer = format!("/users/{}/extra", id);
            prop_assert!(map.resolve(HttpRequestMethod::Get, &longer, &no_headers()).is_none());
        }

        #[test]
        fn prop_literal_routes_ignore_slash_style(name in "[a-z]{1,10}") {
            let mut map = RouteMap::new();
            map.add_route(endpoint(&name, &[])).unwrap();
            for path in [format!("/{}", name), format!("/{}/", name), format!("{}/", name)] {
                prop_assert!(map.resolve(HttpRequestMethod::Get, &path, &no_headers()).is_some());
            }
        }
    }
}
