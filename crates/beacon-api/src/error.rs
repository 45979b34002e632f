//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beacon_core::BeaconError;
use serde::Serialize;

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code from the taxonomy (E1001-E3001, E9999)
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// HTTP status for each error kind.
pub const fn status_for(error: &BeaconError) -> StatusCode {
    match error {
        BeaconError::UpstreamAuthFailure { .. } | BeaconError::InvalidPayload { .. } => {
            StatusCode::BAD_REQUEST
        },
        BeaconError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        BeaconError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        BeaconError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Creates a standardized error response.
pub fn create_error_response(error: &BeaconError) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetail { code: error.code().to_string(), message: error.to_string() },
    };

    (status_for(error), Json(error_response)).into_response()
}
