//! Core domain models, error taxonomy and the subscriber registry.
//!
//! Every other Beacon crate builds on these types: the registry trait is the
//! only coupling point between the webhook path that records subscribers
//! and the broadcast path that reads them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod registry;
pub mod storage;

pub use error::{BeaconError, CoreError, Result};
pub use models::{Message, MessagePayload, SubscriberId};
pub use registry::{PostgresRegistry, SubscriberRegistry};
pub use storage::Storage;
