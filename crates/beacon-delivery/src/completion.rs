//! Client for a remote text-generation service.
//!
//! Speaks the widely used chat-completions request shape: one optional
//! system prompt plus the user's message, answered with a list of choices
//! of which only the first is used.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    client::extract_retry_after_seconds,
    error::{DeliveryError, Result},
};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Text generation capability.
pub trait TextCompletion: Send + Sync + 'static {
    /// Generates an answer for `prompt`. May return an empty string.
    fn complete(&self, prompt: String) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

/// Configuration for the completion client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the service, without trailing slash.
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model name sent with each request.
    pub model: String,
    /// Optional system prompt prepended to every request.
    pub system_prompt: Option<String>,
    /// Timeout for a single request.
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: None,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for the text-generation service.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the API key is empty or
    /// the HTTP client cannot be built.
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(DeliveryError::configuration("completion api key is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Requests a completion for `prompt`.
    ///
    /// Returns the trimmed content of the first choice, or an empty string
    /// when the service answered without one.
    ///
    /// # Errors
    ///
    /// Returns a categorized `DeliveryError` for transport failures, non-2xx
    /// statuses and unparsable bodies.
    pub async fn complete_prompt(&self, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = self.config.system_prompt.as_deref() {
            messages.push(ChatMessage { role: "system", content: system_prompt });
        }
        messages.push(ChatMessage { role: "user", content: prompt });

        let body = CompletionRequest { model: &self.config.model, messages };
        let url = format!("{}{COMPLETIONS_PATH}", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::timeout(self.config.timeout)
                } else {
                    DeliveryError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Completion request rate limited");
            return Err(DeliveryError::rate_limited(extract_retry_after_seconds(response.headers())));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Completion request rejected");
            return Err(if status.is_server_error() {
                DeliveryError::server_error(status.as_u16(), body)
            } else {
                DeliveryError::client_error(status.as_u16(), body)
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::invalid_response(format!("completion body: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        debug!(answer_len = answer.len(), "Completion received");
        Ok(answer)
    }
}

impl TextCompletion for CompletionClient {
    fn complete(&self, prompt: String) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move { self.complete_prompt(&prompt).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = CompletionClient::new(CompletionConfig::default()).unwrap_err();
        assert!(matches!(err, DeliveryError::ConfigurationError { .. }));
    }

    #[test]
    fn request_includes_system_prompt_first() {
        let body = CompletionRequest {
            model: "m",
            messages: vec![
                ChatMessage { role: "system", content: "be brief" },
                ChatMessage { role: "user", content: "hello" },
            ],
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello");
    }

    #[test]
    fn response_without_choices_parses() {
        let parsed: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }
}
