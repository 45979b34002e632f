//! Administrative broadcast and subscriber listing handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beacon_core::{BeaconError, Message, MessagePayload, SubscriberId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn, Instrument};

use crate::{error::create_error_response, AppState};

/// Request body for a broadcast.
///
/// `message` is either a string (text) or `{"contents": {...}, "altText": "..."}`.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// Message to deliver
    #[serde(default)]
    pub message: Option<MessagePayload>,
}

/// Registry listing.
#[derive(Debug, Serialize)]
pub struct SubscribersResponse {
    /// Number of registered subscribers
    pub count: usize,
    /// Registered identifiers, sorted
    pub subscribers: Vec<SubscriberId>,
}

/// Broadcasts a message to every registered subscriber.
///
/// Per-recipient failures do not fail the request; they are listed in the
/// returned delivery report. The fan-out runs as a tracked background task,
/// so a caller that disconnects does not cut it short.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Missing or malformed message (`E1002`)
/// - 503: Registry unavailable (`E3001`)
/// - 500: Any other registry failure
#[instrument(name = "broadcast_message", skip(state, body), fields(body_len = body.len()))]
pub async fn broadcast_message(State(state): State<AppState>, body: Bytes) -> Response {
    let message = match parse_message(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Rejected broadcast request");
            return create_error_response(&e);
        },
    };

    info!(kind = message.kind(), "Broadcast requested");

    let broadcaster = state.broadcaster.clone();
    let task = state.background.spawn(
        async move { broadcaster.broadcast(&message).await }.instrument(tracing::Span::current()),
    );
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Broadcast task aborted");
            return create_error_response(&BeaconError::Internal {
                message: format!("broadcast task aborted: {e}"),
            });
        },
    };

    match outcome {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            let error = BeaconError::from(e);
            if error.is_client_error() {
                warn!(error = %error, "Broadcast rejected");
            } else {
                error!(error = %error, "Broadcast failed");
            }
            create_error_response(&error)
        },
    }
}

/// Lists every registered subscriber.
///
/// # Errors
///
/// Returns 503 when the registry is unavailable.
#[instrument(name = "list_subscribers", skip(state))]
pub async fn list_subscribers(State(state): State<AppState>) -> Response {
    match state.registry.list_all().await {
        Ok(mut subscribers) => {
            subscribers.sort();
            let response = SubscribersResponse { count: subscribers.len(), subscribers };
            (StatusCode::OK, Json(response)).into_response()
        },
        Err(e) => {
            error!(error = %e, "Failed to list subscribers");
            create_error_response(&BeaconError::from(e))
        },
    }
}

fn parse_message(body: &[u8]) -> Result<Message, BeaconError> {
    let request: BroadcastRequest = serde_json::from_slice(body)
        .map_err(|e| BeaconError::invalid_payload(format!("malformed request body: {e}")))?;

    let payload =
        request.message.ok_or_else(|| BeaconError::invalid_payload("message is required"))?;

    Message::try_from(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: &serde_json::Value) -> Result<Message, BeaconError> {
        parse_message(value.to_string().as_bytes())
    }

    #[test]
    fn string_message_is_text() {
        let message = parse(&json!({ "message": "service maintenance at 10pm" })).unwrap();
        assert_eq!(message, Message::text("service maintenance at 10pm"));
    }

    #[test]
    fn object_message_is_rich() {
        let message = parse(&json!({
            "message": { "contents": { "type": "bubble" }, "altText": "Weekly menu" }
        }))
        .unwrap();
        assert_eq!(message.kind(), "rich");
    }

    #[test]
    fn missing_message_is_invalid() {
        let err = parse(&json!({})).unwrap_err();
        assert_eq!(err.code(), "E1002");
    }

    #[test]
    fn non_json_body_is_invalid() {
        let err = parse_message(b"message=hello").unwrap_err();
        assert_eq!(err.code(), "E1002");
    }

    #[test]
    fn numeric_message_is_invalid() {
        let err = parse(&json!({ "message": 42 })).unwrap_err();
        assert_eq!(err.code(), "E1002");
    }
}
