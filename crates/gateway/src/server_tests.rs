// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::breaker::BreakerConfig;
use crate::dispatch::DispatchSettings;
use crate::test_fixtures::{FakeControlPlane, FakeInvoker};
use axum::body::Body;
use esb_core::{test_support, FakeClock, FunctionTable};
use http_body_util::BodyExt;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "server-test-secret";
const API_KEY: &str = "the-api-key";

fn settings() -> DispatchSettings {
    DispatchSettings {
        pool_acquire_timeout: Duration::from_millis(300),
        invoke_timeout: Duration::from_secs(5),
        cache_ttl: Duration::from_secs(30),
        breaker: BreakerConfig::default(),
        pooling_enabled: true,
    }
}

fn app(
    cp: FakeControlPlane,
    invoker: FakeInvoker,
) -> (Router, Shared<FakeControlPlane, FakeInvoker, FakeClock>) {
    let functions = FunctionTable::from_descriptors(vec![
        test_support::descriptor("hello"),
        test_support::descriptor_with_capacity("off", 0),
    ]);
    let auth = Authenticator::new(
        Some(API_KEY.to_string()),
        SECRET,
        vec![("alice".to_string(), "wonderland".to_string())],
    );
    let dispatcher = Arc::new(Dispatcher::new(cp, invoker, FakeClock::new(), settings()));
    let app = Arc::new(GatewayApp {
        auth,
        matcher: RouteMatcher::from_table(&functions),
        functions,
        dispatcher,
    });
    (router(app.clone()), app)
}

fn login_request(api_key: Option<&str>, body: &str) -> Request {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/user/auth/ver1.0")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn good_login_body() -> String {
    r#"{"AuthParameters":{"USERNAME":"alice","PASSWORD":"wonderland"}}"#.to_string()
}

async fn login_token(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(login_request(Some(API_KEY), &good_login_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    json["AuthenticationResult"]["IdToken"].as_str().unwrap().to_string()
}

fn invoke_request(method: &str, path: &str, token: Option<&str>) -> Request {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_returns_an_id_token() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let token = login_token(&router).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn bad_api_key_is_401_without_marker() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let response = router
        .oneshot(login_request(Some("wrong"), &good_login_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(AUTH_MARKER_HEADER).is_none());
}

#[tokio::test]
async fn bad_credentials_are_401_with_marker() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let body = r#"{"AuthParameters":{"USERNAME":"alice","PASSWORD":"wrong"}}"#;
    let response = router.oneshot(login_request(Some(API_KEY), body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(AUTH_MARKER_HEADER).and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn invocation_without_token_is_401() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let response = router.oneshot(invoke_request("GET", "/api/hello", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authorized_invocation_reaches_the_worker() {
    let cp = FakeControlPlane::default();
    let invoker = FakeInvoker::instant();
    let (router, _) = app(cp.clone(), invoker.clone());
    let token = login_token(&router).await;

    let response = router
        .oneshot(invoke_request("GET", "/api/hello", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
    assert_eq!(cp.ensure_calls(), 1);
    assert_eq!(invoker.calls().len(), 1);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let token = login_token(&router).await;
    let response = router
        .oneshot(invoke_request("GET", "/api/nothing-here", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_function_maps_to_503() {
    let (router, _) = app(FakeControlPlane::default(), FakeInvoker::instant());
    let token = login_token(&router).await;
    let response = router
        .oneshot(invoke_request("GET", "/api/off", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn worker_error_maps_to_502() {
    let invoker = FakeInvoker::instant();
    invoker.script_status(500, 1);
    let (router, _) = app(FakeControlPlane::default(), invoker);
    let token = login_token(&router).await;

    let response = router
        .oneshot(invoke_request("GET", "/api/hello", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn shaped_worker_headers_pass_through() {
    let invoker = FakeInvoker::instant();
    invoker.script(Ok(InvokeOutcome {
        status: 201,
        headers: vec![("x-request-id".to_string(), "abc".to_string())],
        body: b"created".to_vec(),
        function_error: false,
    }));
    let (router, _) = app(FakeControlPlane::default(), invoker);
    let token = login_token(&router).await;

    let response = router
        .oneshot(invoke_request("POST", "/api/hello", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("abc")
    );
}
