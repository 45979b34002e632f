//! Broadcast fan-out over the subscriber registry.
//!
//! A broadcast validates the message, reads the registry once, and pushes the
//! message to every identifier. Deliveries are independent: a failure for
//! one recipient is recorded in the report and never stops the others.
//!
//! # Concurrency
//!
//! Deliveries run through a bounded stream. With the default width of 1 they
//! are sequential; a wider setting overlaps network round-trips while still
//! capping the number of in-flight requests. Every delivery is bounded by
//! `delivery_timeout`, so a stalled recipient cannot hold up the broadcast.

use std::{sync::Arc, time::Duration};

use beacon_core::{Message, SubscriberId, SubscriberRegistry};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::{BroadcastError, DeliveryError, ErrorCategory},
    messaging::MessagingApi,
    DEFAULT_BROADCAST_CONCURRENCY, DEFAULT_DELIVERY_TIMEOUT_SECONDS,
};

/// Broadcast tuning.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Maximum deliveries in flight at once.
    pub concurrency: usize,
    /// Upper bound for a single delivery.
    pub delivery_timeout: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BROADCAST_CONCURRENCY,
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECONDS),
        }
    }
}

/// One recipient the message could not be delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelivery {
    /// Recipient identifier
    pub recipient: SubscriberId,
    /// Human-readable failure reason
    pub error: String,
    /// Failure category
    pub category: ErrorCategory,
    /// Whether a manual retry could succeed later
    pub retryable: bool,
}

impl FailedDelivery {
    fn new(recipient: SubscriberId, error: &DeliveryError) -> Self {
        Self {
            recipient,
            error: error.to_string(),
            category: ErrorCategory::from(error),
            retryable: error.is_retryable(),
        }
    }
}

/// Outcome summary of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Deliveries attempted
    pub attempted: usize,
    /// Deliveries accepted by the platform
    pub succeeded: usize,
    /// Deliveries that failed
    pub failed: usize,
    /// Failed recipients with reasons, sorted by recipient
    pub failures: Vec<FailedDelivery>,
}

impl DeliveryReport {
    /// Builds a report from per-recipient outcomes.
    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = (SubscriberId, Result<(), DeliveryError>)>,
    ) -> Self {
        let mut report = Self::default();

        for (recipient, outcome) in outcomes {
            report.attempted += 1;
            match outcome {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    report.failed += 1;
                    report.failures.push(FailedDelivery::new(recipient, &error));
                },
            }
        }

        report.failures.sort_by(|a, b| a.recipient.cmp(&b.recipient));
        report
    }

    /// Identifiers of the recipients that failed.
    pub fn failed_ids(&self) -> Vec<SubscriberId> {
        self.failures.iter().map(|failure| failure.recipient.clone()).collect()
    }

    /// True when every attempted delivery succeeded.
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Fans a message out to every registered subscriber.
pub struct Broadcaster {
    registry: Arc<dyn SubscriberRegistry>,
    messaging: Arc<dyn MessagingApi>,
    config: BroadcastConfig,
}

impl Broadcaster {
    /// Creates a broadcaster over the given registry and messaging capability.
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        messaging: Arc<dyn MessagingApi>,
        config: BroadcastConfig,
    ) -> Self {
        Self { registry, messaging, config }
    }

    /// Delivers `message` to every registered subscriber.
    ///
    /// # Errors
    ///
    /// - `BroadcastError::InvalidPayload` if the message fails validation;
    ///   the registry is not read and nothing is delivered.
    /// - `BroadcastError::Registry` if the registry cannot be read.
    ///
    /// Per-recipient failures are not errors; they are listed in the report.
    #[instrument(name = "broadcast", skip(self, message), fields(kind = message.kind()))]
    pub async fn broadcast(&self, message: &Message) -> Result<DeliveryReport, BroadcastError> {
        message.validate().map_err(BroadcastError::InvalidPayload)?;

        let recipients = self.registry.list_all().await?;
        if recipients.is_empty() {
            info!("Registry is empty, nothing to broadcast");
            return Ok(DeliveryReport::default());
        }

        info!(recipients = recipients.len(), "Starting broadcast");

        let width = self.config.concurrency.max(1);
        let outcomes: Vec<(SubscriberId, Result<(), DeliveryError>)> = stream::iter(recipients)
            .map(|recipient| self.deliver_one(recipient, message.clone()))
            .buffer_unordered(width)
            .collect()
            .await;

        let report = DeliveryReport::from_outcomes(outcomes);
        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Broadcast finished"
        );

        Ok(report)
    }

    async fn deliver_one(
        &self,
        recipient: SubscriberId,
        message: Message,
    ) -> (SubscriberId, Result<(), DeliveryError>) {
        let timeout = self.config.delivery_timeout;
        let outcome =
            match tokio::time::timeout(timeout, self.messaging.push(recipient.clone(), message))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::timeout(timeout)),
            };

        if let Err(error) = &outcome {
            warn!(recipient = %recipient, error = %error, "Delivery failed");
        }

        (recipient, outcome)
    }
}
