//! Reply generation for inbound text messages.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::completion::TextCompletion;

/// Decides what to answer to an inbound text message.
pub enum Responder {
    /// Answer with the received text unchanged.
    Echo,
    /// Ask a text-generation service, falling back to a fixed text when it
    /// fails or answers with nothing.
    Completion {
        /// Text-generation capability
        client: Arc<dyn TextCompletion>,
        /// Answer used when the service fails or returns an empty string
        fallback: String,
    },
}

impl Responder {
    /// Creates a responder backed by a text-generation service.
    pub fn completion(client: Arc<dyn TextCompletion>, fallback: impl Into<String>) -> Self {
        Self::Completion { client, fallback: fallback.into() }
    }

    /// Short label used in logs.
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Completion { .. } => "completion",
        }
    }

    /// Produces the reply text for `text`. Never fails.
    pub async fn respond(&self, text: &str) -> String {
        match self {
            Self::Echo => text.to_string(),
            Self::Completion { client, fallback } => {
                match client.complete(text.to_string()).await {
                    Ok(answer) if !answer.trim().is_empty() => answer,
                    Ok(_) => {
                        debug!("Completion returned empty answer, using fallback");
                        fallback.clone()
                    },
                    Err(e) => {
                        warn!(error = %e, "Completion failed, using fallback");
                        fallback.clone()
                    },
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{future::Future, pin::Pin, time::Duration};

    use super::*;
    use crate::error::{DeliveryError, Result};

    struct FixedCompletion(Result<String>);

    impl TextCompletion for FixedCompletion {
        fn complete(
            &self,
            _prompt: String,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
            let answer = self.0.clone();
            Box::pin(async move { answer })
        }
    }

    #[tokio::test]
    async fn echo_returns_input() {
        assert_eq!(Responder::Echo.respond("hello").await, "hello");
    }

    #[tokio::test]
    async fn completion_answer_is_used() {
        let responder =
            Responder::completion(Arc::new(FixedCompletion(Ok("hi there".to_string()))), "sorry");

        assert_eq!(responder.respond("hello").await, "hi there");
        assert_eq!(responder.mode(), "completion");
    }

    #[tokio::test]
    async fn empty_completion_falls_back() {
        let responder =
            Responder::completion(Arc::new(FixedCompletion(Ok("  ".to_string()))), "sorry");

        assert_eq!(responder.respond("hello").await, "sorry");
    }

    #[tokio::test]
    async fn failed_completion_falls_back() {
        let responder = Responder::completion(
            Arc::new(FixedCompletion(Err(DeliveryError::timeout(Duration::from_secs(20))))),
            "sorry",
        );

        assert_eq!(responder.respond("hello").await, "sorry");
    }
}
