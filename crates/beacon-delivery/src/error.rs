//! Error types for outbound delivery and broadcast operations.
//!
//! `DeliveryError` describes why a single push, reply or completion call
//! failed; broadcast collects these per recipient instead of raising them.
//! `BroadcastError` covers the failures that stop a broadcast before any
//! delivery is attempted.

use std::{fmt, time::Duration};

use beacon_core::{BeaconError, CoreError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Error types for a single outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// Request did not complete in time.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Milliseconds before the request timed out
        timeout_ms: u64,
    },

    /// Platform rejected the request (4xx), e.g. blocked or unknown recipient.
    #[error("client error: HTTP {status_code}")]
    ClientError {
        /// HTTP status code (4xx)
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// Platform failed to process the request (5xx).
    #[error("server error: HTTP {status_code}")]
    ServerError {
        /// HTTP status code (5xx)
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_seconds: u64,
    },

    /// Response could not be interpreted.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// What was wrong with the response
        message: String,
    },

    /// Client misconfiguration.
    #[error("invalid client configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },
}

impl DeliveryError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX) }
    }

    /// Creates a client error from HTTP response.
    pub fn client_error(status_code: u16, body: impl Into<String>) -> Self {
        Self::ClientError { status_code, body: body.into() }
    }

    /// Creates a server error from HTTP response.
    pub fn server_error(status_code: u16, body: impl Into<String>) -> Self {
        Self::ServerError { status_code, body: body.into() }
    }

    /// Creates a rate limit error.
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::RateLimited { retry_after_seconds }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Determines whether a manual retry could succeed later.
    ///
    /// True for network errors, timeouts, server errors and rate limits.
    /// Client errors mean the platform refused this recipient outright.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::ServerError { .. }
            | Self::RateLimited { .. } => true,

            Self::ClientError { .. } | Self::InvalidResponse { .. } | Self::ConfigurationError { .. } => {
                false
            },
        }
    }
}

/// Category of delivery error for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network connectivity issues and timeouts.
    Network,
    /// Rejected by the platform (4xx).
    Client,
    /// Platform failure (5xx).
    Server,
    /// Rate limiting.
    RateLimit,
    /// Local configuration or unexpected responses.
    Internal,
}

impl From<&DeliveryError> for ErrorCategory {
    fn from(error: &DeliveryError) -> Self {
        match error {
            DeliveryError::NetworkError { .. } | DeliveryError::Timeout { .. } => Self::Network,
            DeliveryError::ClientError { .. } => Self::Client,
            DeliveryError::ServerError { .. } => Self::Server,
            DeliveryError::RateLimited { .. } => Self::RateLimit,
            DeliveryError::InvalidResponse { .. } | DeliveryError::ConfigurationError { .. } => {
                Self::Internal
            },
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Failures that abort a broadcast before any recipient is contacted.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The message failed validation.
    #[error(transparent)]
    InvalidPayload(BeaconError),

    /// The registry could not be read.
    #[error("registry read failed: {0}")]
    Registry(#[from] CoreError),
}

impl From<BroadcastError> for BeaconError {
    fn from(err: BroadcastError) -> Self {
        match err {
            BroadcastError::InvalidPayload(inner) => inner,
            BroadcastError::Registry(inner) => inner.into(),
        }
    }
}
