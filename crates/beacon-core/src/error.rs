//! Error types and result handling for registry and service operations.
//!
//! `CoreError` covers repository failures and is what the storage layer
//! returns. `BeaconError` is the service-level taxonomy with stable codes
//! that HTTP handlers surface to callers.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for storage operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// The backing store could not be reached.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl CoreError {
    /// Returns whether the error means the store itself is unreachable.
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => Self::StorageUnavailable(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Beacon error types with stable codes.
#[derive(Debug, Error)]
pub enum BeaconError {
    // Request Errors (E1001-E1003)
    /// Inbound webhook signature did not verify (E1001).
    #[error("[E1001] Upstream authentication failed: {reason}")]
    UpstreamAuthFailure {
        /// Why verification failed
        reason: String,
    },

    /// Request body is missing or malformed (E1002).
    #[error("[E1002] Invalid payload: {reason}")]
    InvalidPayload {
        /// What was wrong with the payload
        reason: String,
    },

    /// Administrative request without a valid token (E1003).
    #[error("[E1003] Unauthorized: {reason}")]
    Unauthorized {
        /// Why the request was refused
        reason: String,
    },

    // System Errors (E3001)
    /// Registry store unreachable (E3001).
    #[error("[E3001] Storage unavailable: {reason}")]
    StorageUnavailable {
        /// Underlying storage failure
        reason: String,
    },

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Error details
        message: String,
    },
}

impl BeaconError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload { reason: reason.into() }
    }

    /// Creates an upstream authentication error.
    pub fn upstream_auth(reason: impl Into<String>) -> Self {
        Self::UpstreamAuthFailure { reason: reason.into() }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized { reason: reason.into() }
    }

    /// Returns the error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UpstreamAuthFailure { .. } => "E1001",
            Self::InvalidPayload { .. } => "E1002",
            Self::Unauthorized { .. } => "E1003",
            Self::StorageUnavailable { .. } => "E3001",
            Self::Internal { .. } => "E9999",
        }
    }

    /// Returns whether the error is the caller's fault.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamAuthFailure { .. } | Self::InvalidPayload { .. } | Self::Unauthorized { .. }
        )
    }
}

impl From<CoreError> for BeaconError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::StorageUnavailable(reason) => Self::StorageUnavailable { reason },
            CoreError::Database(message) => Self::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(BeaconError::upstream_auth("mismatch").code(), "E1001");
        assert_eq!(BeaconError::invalid_payload("missing").code(), "E1002");
        assert_eq!(BeaconError::unauthorized("no token").code(), "E1003");
        assert_eq!(
            BeaconError::StorageUnavailable { reason: "down".to_string() }.code(),
            "E3001"
        );
        assert_eq!(BeaconError::Internal { message: "boom".to_string() }.code(), "E9999");
    }

    #[test]
    fn client_errors_identified() {
        assert!(BeaconError::upstream_auth("x").is_client_error());
        assert!(BeaconError::invalid_payload("x").is_client_error());
        assert!(BeaconError::unauthorized("x").is_client_error());
        assert!(!BeaconError::StorageUnavailable { reason: "x".to_string() }.is_client_error());
    }

    #[test]
    fn pool_failures_map_to_unavailable() {
        assert!(CoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(CoreError::from(sqlx::Error::PoolClosed).is_unavailable());
        assert!(!CoreError::from(sqlx::Error::RowNotFound).is_unavailable());
    }

    #[test]
    fn core_errors_convert_to_service_taxonomy() {
        let err = BeaconError::from(CoreError::StorageUnavailable("refused".to_string()));
        assert_eq!(err.code(), "E3001");
        assert_eq!(err.to_string(), "[E3001] Storage unavailable: refused");

        let err = BeaconError::from(CoreError::Database("syntax".to_string()));
        assert_eq!(err.code(), "E9999");
    }
}
