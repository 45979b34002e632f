//! Shared fixtures for API integration tests.
//!
//! Builds a router over the in-memory registry and the recording messaging
//! double, and signs webhook bodies the way the platform does.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use beacon_api::{create_router, crypto::generate_signature, AppState, AuthSettings};
use beacon_core::registry::mock::MockSubscriberRegistry;
use beacon_delivery::{
    messaging::mock::MockMessagingApi, BroadcastConfig, DeliveryError, Responder, TextCompletion,
};
use serde_json::Value;
use tower::ServiceExt;

pub const CHANNEL_SECRET: &str = "test-channel-secret";
pub const SIGNATURE_HEADER: &str = "x-line-signature";
pub const ADMIN_TOKEN: &str = "test-admin-token";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TestApp {
    pub registry: MockSubscriberRegistry,
    pub messaging: MockMessagingApi,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    /// Echo replies, no admin token.
    pub fn new() -> Self {
        Self::with_options(Responder::Echo, None)
    }

    pub fn with_admin_token() -> Self {
        Self::with_options(Responder::Echo, Some(ADMIN_TOKEN))
    }

    pub fn with_responder(responder: Responder) -> Self {
        Self::with_options(responder, None)
    }

    pub fn with_options(responder: Responder, admin_token: Option<&str>) -> Self {
        let broadcast = BroadcastConfig { concurrency: 2, delivery_timeout: Duration::from_secs(5) };
        Self::build(responder, admin_token, broadcast)
    }

    /// Echo replies, no admin token, custom broadcast tuning.
    pub fn with_broadcast(broadcast: BroadcastConfig) -> Self {
        Self::build(Responder::Echo, None, broadcast)
    }

    fn build(responder: Responder, admin_token: Option<&str>, broadcast: BroadcastConfig) -> Self {
        let registry = MockSubscriberRegistry::new();
        let messaging = MockMessagingApi::new();

        let auth = AuthSettings {
            channel_secret: CHANNEL_SECRET.to_string(),
            signature_header: SIGNATURE_HEADER.to_string(),
            admin_token: admin_token.map(str::to_string),
        };
        let state = AppState::new(
            Arc::new(registry.clone()),
            Arc::new(messaging.clone()),
            responder,
            auth,
            broadcast,
        );

        let router = create_router(state.clone(), REQUEST_TIMEOUT);
        Self { registry, messaging, state, router }
    }

    /// Waits for replies spawned by earlier webhooks.
    pub async fn settle(&self) {
        self.state.background.close();
        self.state.background.wait().await;
        self.state.background.reopen();
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router should respond")
    }

    /// Posts a correctly signed webhook body.
    pub async fn callback(&self, body: &Value) -> Response<Body> {
        self.send(signed_callback(&body.to_string())).await
    }

    /// Posts a broadcast request without credentials.
    pub async fn broadcast(&self, body: &Value) -> Response<Body> {
        self.send(broadcast_request(&body.to_string(), None)).await
    }
}

pub fn signed_callback(body: &str) -> Request<Body> {
    let signature = generate_signature(body.as_bytes(), CHANNEL_SECRET).unwrap();

    Request::builder()
        .method("POST")
        .uri("/callback")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn broadcast_request(body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder =
        Request::builder().method("POST").uri("/broadcast").header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

pub fn follow_event(user_id: &str) -> Value {
    serde_json::json!({
        "type": "follow",
        "timestamp": 1_700_000_000_000_i64,
        "replyToken": format!("follow-token-{user_id}"),
        "source": { "type": "user", "userId": user_id }
    })
}

pub fn text_event(user_id: &str, reply_token: &str, text: &str) -> Value {
    serde_json::json!({
        "type": "message",
        "timestamp": 1_700_000_000_000_i64,
        "replyToken": reply_token,
        "source": { "type": "user", "userId": user_id },
        "message": { "id": "100001", "type": "text", "text": text }
    })
}

pub fn webhook(events: Vec<Value>) -> Value {
    serde_json::json!({ "destination": "Ubot", "events": events })
}

/// Completion double answering every prompt with a fixed result.
pub struct FixedCompletion(pub Result<String, DeliveryError>);

impl TextCompletion for FixedCompletion {
    fn complete(
        &self,
        _prompt: String,
    ) -> Pin<Box<dyn Future<Output = Result<String, DeliveryError>> + Send + '_>> {
        let answer = self.0.clone();
        Box::pin(async move { answer })
    }
}

/// Completion double that answers after a delay.
pub struct DelayedCompletion {
    pub delay: Duration,
    pub answer: String,
}

impl TextCompletion for DelayedCompletion {
    fn complete(
        &self,
        _prompt: String,
    ) -> Pin<Box<dyn Future<Output = Result<String, DeliveryError>> + Send + '_>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(self.answer.clone())
        })
    }
}
