//! HTTP request handlers.
//!
//! - `webhook` - Platform callback: signature check, follow registration,
//!   text replies
//! - `broadcast` - Administrative fan-out and subscriber listing
//! - `health` - Health, readiness and liveness probes
//!
//! Errors are returned as `{"error": {"code": "E1002", "message": "..."}}`
//! with the status chosen by `crate::error::status_for`.

pub mod broadcast;
pub mod health;
pub mod webhook;

pub use broadcast::{broadcast_message, list_subscribers};
pub use health::{health_check, liveness_check, readiness_check};
pub use webhook::callback;
