use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Value;

use std::{collections::HashMap, sync::Arc};

use webframework::{
    method::{Arguments, Handler, Method},
    route::{Endpoint, RouteMap},
    ContentType, HttpRequestMethod,
};

fn endpoint(route: &str) -> Endpoint {
    let handler: Handler = Arc::new(|_args: &mut Arguments<'_>| Ok(Value::Null));
    Endpoint::new(
        route,
        HttpRequestMethod::Get,
        ContentType::Json,
        Method::new(vec![], handler),
        vec![],
        vec![],
        webframework::default_error_handler(),
    )
}

fn route_map(literal: usize, variable: usize) -> RouteMap {
    let mut map = RouteMap::new();
    for i in 0..literal {
        map.add_route(endpoint(&format!("/static/page{}", i))).unwrap();
    }
    for i in 0..variable {
        map.add_route(endpoint(&format!("/api/v{}/users/{{id}}", i))).unwrap();
    }
    map
}

fn exact_match_benchmark(c: &mut Criterion) {
    let map = route_map(100, 100);
    let headers = HashMap::new();

    c.bench_function("route_exact_match", |b| {
        b.iter(|| map.resolve(HttpRequestMethod::Get, black_box("/static/page50"), &headers));
    });
}

fn variable_match_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_variable_match");
    let headers = HashMap::new();

    for variable in [1usize, 10, 100] {
        let map = route_map(10, variable);
        let path = format!("/api/v{}/users/42", variable - 1);
        group.bench_with_input(BenchmarkId::from_parameter(variable), &path, |b, path| {
            b.iter(|| map.resolve(HttpRequestMethod::Get, black_box(path), &headers));
        });
    }

    group.finish();
}

fn miss_benchmark(c: &mut Criterion) {
    let map = route_map(100, 100);
    let headers = HashMap::new();

    c.bench_function("route_miss", |b| {
        b.iter(|| map.resolve(HttpRequestMethod::Get, black_box("/assets/app.js"), &headers));
    });
}

criterion_group!(benches, exact_match_benchmark, variable_match_benchmark, miss_benchmark);
criterion_main!(benches);
