//! Outbound messaging, broadcast fan-out and reply generation.
//!
//! This crate holds everything that talks to the outside world on the
//! sending side: the messaging platform's push and reply endpoints, an
//! optional text-generation service, and the fan-out that pushes one message
//! to every registered subscriber.
//!
//! # Broadcast
//!
//! 1. **Validate** - Malformed messages are rejected before any side effect
//! 2. **Snapshot** - The registry is read exactly once
//! 3. **Deliver** - One push per identifier, each bounded by a timeout
//! 4. **Report** - Successes and failures are counted, failures listed
//!
//! A failed delivery never aborts the broadcast. Subscribers that fail are
//! left in the registry.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use beacon_core::{registry::mock::MockSubscriberRegistry, Message};
//! use beacon_delivery::{messaging::mock::MockMessagingApi, BroadcastConfig, Broadcaster};
//!
//! # async fn example() -> Result<(), beacon_delivery::BroadcastError> {
//! let registry = Arc::new(MockSubscriberRegistry::with_ids(["U1", "U2"]).await);
//! let messaging = Arc::new(MockMessagingApi::new());
//! let broadcaster = Broadcaster::new(registry, messaging, BroadcastConfig::default());
//!
//! let report = broadcaster.broadcast(&Message::text("service maintenance at 10pm")).await?;
//! assert_eq!(report.succeeded, 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broadcast;
pub mod client;
pub mod completion;
pub mod error;
pub mod messaging;
pub mod reply;

pub use broadcast::{BroadcastConfig, Broadcaster, DeliveryReport, FailedDelivery};
pub use client::{ClientConfig, MessagingClient};
pub use completion::{CompletionClient, CompletionConfig, TextCompletion};
pub use error::{BroadcastError, DeliveryError, ErrorCategory, Result};
pub use messaging::MessagingApi;
pub use reply::Responder;

/// Default number of deliveries in flight during a broadcast.
pub const DEFAULT_BROADCAST_CONCURRENCY: usize = 1;

/// Default per-delivery timeout in seconds.
pub const DEFAULT_DELIVERY_TIMEOUT_SECONDS: u64 = 10;
