//! Outbound messaging capability.
//!
//! The broadcast fan-out and the webhook reply path only need two calls from
//! the platform: push a message to a subscriber and answer a reply token.
//! `MessagingClient` implements them over HTTP; `mock::MockMessagingApi`
//! records calls and injects failures for tests.

use std::{future::Future, pin::Pin};

use beacon_core::{Message, SubscriberId};

use crate::error::Result;

/// Outbound calls to the messaging platform.
pub trait MessagingApi: Send + Sync + 'static {
    /// Pushes a message to one subscriber.
    fn push(
        &self,
        to: SubscriberId,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Answers an inbound event using its reply token.
    fn reply(
        &self,
        reply_token: String,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Recording test double.
pub mod mock {
    use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

    use beacon_core::{Message, SubscriberId};
    use tokio::sync::RwLock;

    use super::MessagingApi;
    use crate::error::{DeliveryError, Result};

    /// Messaging double that records every call.
    ///
    /// Pushes to recipients registered with `fail_for` return the given error;
    /// recipients registered with `delay_for` sleep before answering.
    #[derive(Clone, Default)]
    pub struct MockMessagingApi {
        pushes: Arc<RwLock<Vec<(SubscriberId, Message)>>>,
        replies: Arc<RwLock<Vec<(String, Message)>>>,
        failures: Arc<RwLock<HashMap<SubscriberId, DeliveryError>>>,
        delays: Arc<RwLock<HashMap<SubscriberId, Duration>>>,
        reply_failure: Arc<RwLock<Option<DeliveryError>>>,
    }

    impl MockMessagingApi {
        /// Creates a double that accepts everything.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes pushes to `recipient` fail with `error`.
        pub async fn fail_for(&self, recipient: impl Into<SubscriberId>, error: DeliveryError) {
            self.failures.write().await.insert(recipient.into(), error);
        }

        /// Makes pushes to `recipient` take `delay` before completing.
        pub async fn delay_for(&self, recipient: impl Into<SubscriberId>, delay: Duration) {
            self.delays.write().await.insert(recipient.into(), delay);
        }

        /// Makes every reply fail with `error`.
        pub async fn fail_replies(&self, error: DeliveryError) {
            *self.reply_failure.write().await = Some(error);
        }

        /// Every push attempted so far, failed ones included.
        pub async fn pushes(&self) -> Vec<(SubscriberId, Message)> {
            self.pushes.read().await.clone()
        }

        /// Number of push attempts so far.
        pub async fn push_count(&self) -> usize {
            self.pushes.read().await.len()
        }

        /// Every reply attempted so far.
        pub async fn replies(&self) -> Vec<(String, Message)> {
            self.replies.read().await.clone()
        }
    }

    impl MessagingApi for MockMessagingApi {
        fn push(
            &self,
            to: SubscriberId,
            message: Message,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.pushes.write().await.push((to.clone(), message));

                let delay = self.delays.read().await.get(&to).copied();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                match self.failures.read().await.get(&to) {
                    Some(error) => Err(error.clone()),
                    None => Ok(()),
                }
            })
        }

        fn reply(
            &self,
            reply_token: String,
            message: Message,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.replies.write().await.push((reply_token, message));

                match self.reply_failure.read().await.as_ref() {
                    Some(error) => Err(error.clone()),
                    None => Ok(()),
                }
            })
        }
    }
}
