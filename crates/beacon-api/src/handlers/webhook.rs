//! Messaging platform webhook handler.
//!
//! Verifies the body signature, then dispatches each event: follows are
//! recorded in the registry before the response, text messages are answered
//! through the reply token from a background task. Once the signature checks
//! out the platform always gets a 200, even when registration or replying
//! fails, so it does not redeliver. A slow completion service never delays
//! the acknowledgement or the follows later in the same batch.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use beacon_core::{BeaconError, Message, SubscriberId};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::{crypto::validate_signature, error::create_error_response, AppState};

/// Webhook request body.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Bot user the events were sent to
    #[serde(default)]
    pub destination: Option<String>,
    /// Events, kept raw so one malformed event does not reject the batch
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Platform event.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// A user added the bot.
    Follow {
        /// Who followed
        source: EventSource,
    },
    /// A user blocked the bot.
    Unfollow {
        /// Who unfollowed
        source: EventSource,
    },
    /// A user sent a message.
    Message {
        /// Who sent it
        source: EventSource,
        /// Token for answering this event
        #[serde(default, rename = "replyToken")]
        reply_token: Option<String>,
        /// Message content
        message: InboundMessage,
    },
    /// Any event type that is not handled.
    #[serde(other)]
    Other,
}

/// Originator of an event.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// Sender, absent for some group events
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Inbound message content.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Plain text.
    Text {
        /// Message body
        text: String,
    },
    /// Stickers, images and everything else.
    #[serde(other)]
    Other,
}

/// Receives platform webhooks.
///
/// # Errors
///
/// Returns HTTP 400 when the signature does not verify (`E1001`) or the body
/// is not a webhook document (`E1002`). Nothing is dispatched in either case.
#[instrument(name = "callback", skip(state, headers, body), fields(body_len = body.len()))]
pub async fn callback(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(state.auth.signature_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let validation = validate_signature(&body, signature, &state.auth.channel_secret);
    if !validation.is_valid {
        let reason = validation.error_message.unwrap_or_else(|| "signature mismatch".to_string());
        warn!(reason = %reason, "Webhook signature rejected");
        return create_error_response(&BeaconError::upstream_auth(reason));
    }

    let request: CallbackRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Webhook body is not valid JSON");
            return create_error_response(&BeaconError::invalid_payload(format!(
                "malformed webhook body: {e}"
            )));
        },
    };

    debug!(
        destination = request.destination.as_deref().unwrap_or("unknown"),
        events = request.events.len(),
        "Webhook verified"
    );

    for raw in request.events {
        match serde_json::from_value::<Event>(raw) {
            Ok(event) => dispatch_event(&state, event).await,
            Err(e) => warn!(error = %e, "Skipping malformed event"),
        }
    }

    (StatusCode::OK, "OK").into_response()
}

async fn dispatch_event(state: &AppState, event: Event) {
    match event {
        Event::Follow { source } => {
            let Some(user_id) = source.user_id else {
                debug!("Follow event without user id");
                return;
            };
            register_follower(state, SubscriberId::from(user_id)).await;
        },
        Event::Unfollow { source } => {
            info!(
                user_id = source.user_id.as_deref().unwrap_or("unknown"),
                "Unfollow received, registry left unchanged"
            );
        },
        Event::Message { reply_token, message: InboundMessage::Text { text }, .. } => {
            let Some(reply_token) = reply_token else {
                debug!("Text message without reply token");
                return;
            };
            spawn_reply(state, reply_token, text);
        },
        Event::Message { .. } => debug!("Ignoring non-text message"),
        Event::Other => debug!("Ignoring unhandled event type"),
    }
}

async fn register_follower(state: &AppState, id: SubscriberId) {
    match state.registry.register(id.clone()).await {
        Ok(true) => info!(user_id = %id, "Subscriber registered"),
        Ok(false) => debug!(user_id = %id, "Subscriber already registered"),
        Err(e) => error!(user_id = %id, error = %e, "Failed to register subscriber"),
    }
}

fn spawn_reply(state: &AppState, reply_token: String, text: String) {
    let task_state = state.clone();
    state.background.spawn(
        async move { reply_to_text(&task_state, reply_token, &text).await }
            .instrument(tracing::Span::current()),
    );
}

async fn reply_to_text(state: &AppState, reply_token: String, text: &str) {
    let answer = state.responder.respond(text).await;
    let reply = Message::text(answer);

    if let Err(e) = reply.validate() {
        warn!(error = %e, mode = state.responder.mode(), "Reply not sendable, skipping");
        return;
    }

    match state.messaging.reply(reply_token, reply).await {
        Ok(()) => debug!(mode = state.responder.mode(), "Reply sent"),
        Err(e) => error!(error = %e, "Failed to send reply"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn follow_event_parses() {
        let event: Event = serde_json::from_value(json!({
            "type": "follow",
            "timestamp": 1_700_000_000_000_i64,
            "replyToken": "token-1",
            "source": { "type": "user", "userId": "U1" }
        }))
        .unwrap();

        assert_eq!(event, Event::Follow { source: EventSource { user_id: Some("U1".to_string()) } });
    }

    #[test]
    fn text_message_event_parses() {
        let event: Event = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "token-2",
            "source": { "type": "user", "userId": "U2" },
            "message": { "id": "1", "type": "text", "text": "hello" }
        }))
        .unwrap();

        match event {
            Event::Message { reply_token, message, .. } => {
                assert_eq!(reply_token.as_deref(), Some("token-2"));
                assert_eq!(message, InboundMessage::Text { text: "hello".to_string() });
            },
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[test]
    fn sticker_message_is_other() {
        let event: Event = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "token-3",
            "source": { "type": "user", "userId": "U3" },
            "message": { "id": "2", "type": "sticker", "packageId": "1", "stickerId": "1" }
        }))
        .unwrap();

        assert!(matches!(event, Event::Message { message: InboundMessage::Other, .. }));
    }

    #[test]
    fn unknown_event_type_is_other() {
        let event: Event = serde_json::from_value(json!({
            "type": "postback",
            "source": { "type": "user", "userId": "U4" },
            "postback": { "data": "action=buy" }
        }))
        .unwrap();

        assert_eq!(event, Event::Other);
    }

    #[test]
    fn verification_body_has_no_events() {
        let request: CallbackRequest =
            serde_json::from_value(json!({ "destination": "Uabc", "events": [] })).unwrap();

        assert!(request.events.is_empty());
    }
}
