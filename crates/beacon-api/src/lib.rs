//! Beacon HTTP API.
//!
//! Receives the messaging platform's webhooks, exposes the administrative
//! broadcast endpoint and serves health probes. Handlers reach the registry,
//! the messaging platform and the reply generator only through [`AppState`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::Config;
pub use server::{create_router, start_server};
pub use state::{AppState, AuthSettings};
