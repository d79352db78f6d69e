use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde_json::{json, Value};

use routier::{
    Handler, KeyStrategy, LoggingMiddleware, Middleware, MiddlewarePipeline, RateLimiter,
    RateLimitMiddleware, Request, Response, RouterError, SlidingWindowLimiter,
};

fn ok_core() -> Arc<dyn Handler> {
    Arc::new(|_req: Request| Ok(Response::ok(Value::Null)))
}

#[test]
fn logging_middleware_is_transparent() {
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(LoggingMiddleware));

    let core: Arc<dyn Handler> =
        Arc::new(|_req: Request| Ok(Response::json(201, json!({"id": 7}))));
    let response = pipeline
        .handle(Request::new(Method::POST, "/items"), core)
        .expect("logging must not alter the outcome");
    assert_eq!(response.status, 201);
    assert_eq!(response.body, json!({"id": 7}));
}

#[test]
fn logging_middleware_repropagates_errors() {
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(LoggingMiddleware));

    let failing: Arc<dyn Handler> = Arc::new(|_req: Request| {
        Err(RouterError::NotFound {
            path: "/items".to_string(),
        })
    });
    let err = pipeline
        .handle(Request::new(Method::GET, "/items"), failing)
        .expect_err("error passes through");
    assert_eq!(err.status_code(), 404);
}

#[test]
fn sliding_limiter_works_behind_the_middleware() {
    let limiter = Arc::new(SlidingWindowLimiter::new(2, Duration::from_secs(60)));
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(
        RateLimitMiddleware::new(Arc::clone(&limiter) as Arc<dyn RateLimiter>)
            .with_strategy(KeyStrategy::PathHash),
    ));

    let request = || Request::new(Method::GET, "/api/pets").with_client_ip("10.0.0.9");

    pipeline.handle(request(), ok_core()).expect("first hit");
    pipeline.handle(request(), ok_core()).expect("second hit");
    assert!(matches!(
        pipeline.handle(request(), ok_core()),
        Err(RouterError::RateLimitExceeded { .. })
    ));

    // A different path has its own budget under the path-hash strategy.
    pipeline
        .handle(
            Request::new(Method::GET, "/api/users").with_client_ip("10.0.0.9"),
            ok_core(),
        )
        .expect("separate key");
    assert_eq!(limiter.stats().entries, 2);
}

struct Stamp;

impl Middleware for Stamp {
    fn handle(&self, req: Request, next: &dyn Handler) -> routier::Result<Response> {
        let response = next.call(req)?;
        Ok(response.with_header("X-Stamped", "yes"))
    }
}

#[test]
fn middleware_can_rewrite_the_response() {
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(Stamp));

    let response = pipeline
        .handle(Request::new(Method::GET, "/"), ok_core())
        .expect("dispatch");
    assert_eq!(response.headers.get("X-Stamped").map(String::as_str), Some("yes"));
}
