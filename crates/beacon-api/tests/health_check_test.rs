//! Health check endpoint tests.
//!
//! Health and readiness follow the registry's availability; liveness never
//! touches it. Every response carries a request id.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use axum::http::StatusCode;
use common::{body_json, get, TestApp};

#[tokio::test]
async fn health_check_returns_success_when_registry_is_up() {
    let app = TestApp::new();

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["registry"]["status"], "up");
    assert!(body["checks"]["registry"].get("message").is_none());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn health_check_reports_registry_outage() {
    let app = TestApp::new();
    app.registry.make_unavailable("connection refused").await;

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["registry"]["status"], "down");
    assert!(body["checks"]["registry"]["message"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn readiness_follows_registry() {
    let app = TestApp::new();
    assert_eq!(app.send(get("/ready")).await.status(), StatusCode::OK);

    app.registry.make_unavailable("pool timed out").await;
    assert_eq!(app.send(get("/ready")).await.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn liveness_ignores_registry() {
    let app = TestApp::new();
    app.registry.make_unavailable("connection refused").await;

    let response = app.send(get("/live")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "alive");
    assert_eq!(body["service"], "beacon");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::new();

    let response = app.send(get("/live")).await;

    let request_id = response.headers().get("x-request-id").expect("request id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.send(get("/nope")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
