//! HTTP client for the messaging platform's push and reply endpoints.
//!
//! Handles request construction, authentication and response
//! categorization so that callers receive a typed `DeliveryError` for every
//! failed call.

use std::{future::Future, pin::Pin, time::Duration};

use beacon_core::{Message, SubscriberId};
use reqwest::{header::HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    error::{DeliveryError, Result},
    messaging::MessagingApi,
};

const PUSH_PATH: &str = "/v2/bot/message/push";
const REPLY_PATH: &str = "/v2/bot/message/reply";
const RETRY_KEY_HEADER: &str = "X-Line-Retry-Key";
const DEFAULT_RETRY_AFTER: u64 = 60;
const MAX_ERROR_BODY: usize = 1024;

/// Configuration for the messaging client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the messaging API, without trailing slash.
    pub base_url: String,
    /// Long-lived channel access token sent as a bearer credential.
    pub channel_access_token: String,
    /// Timeout for a single HTTP request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.line.me".to_string(),
            channel_access_token: String::new(),
            timeout: Duration::from_secs(10),
            user_agent: "Beacon/1.0".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [&'a Message; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [&'a Message; 1],
}

/// HTTP client for the messaging platform.
///
/// Reuses one connection pool for all calls. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessagingClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl MessagingClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Pushes a message to one subscriber.
    ///
    /// Each push carries a fresh retry key so the platform can de-duplicate
    /// a request that is resent after an ambiguous failure.
    ///
    /// # Errors
    ///
    /// Returns categorized delivery errors:
    /// - `NetworkError` / `Timeout` for transport failures
    /// - `RateLimited` for 429 responses
    /// - `ClientError` for other 4xx responses (unknown or blocked user)
    /// - `ServerError` for 5xx responses
    pub async fn push_message(&self, to: &SubscriberId, message: &Message) -> Result<()> {
        let span = info_span!("push_message", recipient = %to, kind = message.kind());

        async move {
            let body = PushRequest { to: to.as_str(), messages: [message] };
            let request = self
                .client
                .post(self.url(PUSH_PATH))
                .bearer_auth(&self.config.channel_access_token)
                .header(RETRY_KEY_HEADER, Uuid::new_v4().to_string())
                .json(&body);

            self.execute(request).await
        }
        .instrument(span)
        .await
    }

    /// Sends a reply using the token from an inbound event.
    ///
    /// # Errors
    ///
    /// Same categorization as [`MessagingClient::push_message`]. Reply tokens
    /// expire quickly; an expired token surfaces as a `ClientError`.
    pub async fn reply_message(&self, reply_token: &str, message: &Message) -> Result<()> {
        let span = info_span!("reply_message", kind = message.kind());

        async move {
            let body = ReplyRequest { reply_token, messages: [message] };
            let request = self
                .client
                .post(self.url(REPLY_PATH))
                .bearer_auth(&self.config.channel_access_token)
                .json(&body);

            self.execute(request).await
        }
        .instrument(span)
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let start_time = std::time::Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(duration_ms = start_time.elapsed().as_millis(), "Request failed: {}", e);

                if e.is_timeout() {
                    return Err(DeliveryError::timeout(self.config.timeout));
                }
                if e.is_connect() {
                    return Err(DeliveryError::network(format!("connection failed: {e}")));
                }
                return Err(DeliveryError::network(e.to_string()));
            },
        };

        debug!(
            status = response.status().as_u16(),
            duration_ms = start_time.elapsed().as_millis(),
            "Received response"
        );

        categorize_response(response).await
    }
}

/// Maps a platform response to success or a typed error.
async fn categorize_response(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = extract_retry_after_seconds(response.headers());
        return Err(DeliveryError::rate_limited(retry_after));
    }

    let body = read_error_body(response).await;
    if status.is_client_error() {
        warn!(status = status.as_u16(), body = %body, "Platform rejected request");
        Err(DeliveryError::client_error(status.as_u16(), body))
    } else if status.is_server_error() {
        warn!(status = status.as_u16(), "Platform server error");
        Err(DeliveryError::server_error(status.as_u16(), body))
    } else {
        Err(DeliveryError::invalid_response(format!("unexpected status {status}")))
    }
}

async fn read_error_body(response: Response) -> String {
    match response.text().await {
        Ok(text) if text.len() > MAX_ERROR_BODY => {
            let mut cut = MAX_ERROR_BODY;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &text[..cut])
        },
        Ok(text) => text,
        Err(e) => format!("[Failed to read response body: {e}]"),
    }
}

/// Extracts the retry-after delay in seconds.
///
/// Supports both seconds and HTTP-date formats. Falls back to 60 seconds
/// when the header is absent or unparsable.
pub fn extract_retry_after_seconds(headers: &HeaderMap) -> u64 {
    let Some(retry_after) = headers.get("retry-after").and_then(|v| v.to_str().ok()) else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = retry_after.trim().parse::<u64>() {
        return seconds;
    }

    if let Ok(date_time) = chrono::DateTime::parse_from_rfc2822(retry_after) {
        let remaining = date_time.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(remaining) = remaining.to_std() {
            return remaining.as_secs();
        }
        return 0;
    }

    DEFAULT_RETRY_AFTER
}

impl MessagingApi for MessagingClient {
    fn push(
        &self,
        to: SubscriberId,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.push_message(&to, &message).await })
    }

    fn reply(
        &self,
        reply_token: String,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.reply_message(&reply_token, &message).await })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_retry_after_seconds(&headers), 60);

        headers.insert("retry-after", HeaderValue::from_static("120"));
        assert_eq!(extract_retry_after_seconds(&headers), 120);

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(extract_retry_after_seconds(&headers), 60);

        headers.insert("retry-after", HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(extract_retry_after_seconds(&headers), 0);
    }

    #[test]
    fn url_joins_base_and_path() {
        let client = MessagingClient::new(ClientConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();

        assert_eq!(client.url(PUSH_PATH), "http://localhost:9000/v2/bot/message/push");
    }

    #[test]
    fn push_body_wire_shape() {
        let message = Message::text("hi");
        let body = PushRequest { to: "U1", messages: [&message] };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "to": "U1", "messages": [{ "type": "text", "text": "hi" }] }));
    }

    #[test]
    fn reply_body_uses_camel_case_token() {
        let message = Message::text("hi");
        let body = ReplyRequest { reply_token: "token-1", messages: [&message] };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["replyToken"], "token-1");
    }
}
