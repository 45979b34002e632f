//! Admin bearer-token authentication for administrative routes.
//!
//! When no admin token is configured every request passes; otherwise the
//! `Authorization: Bearer <token>` header must match it exactly.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use beacon_core::BeaconError;
use tracing::warn;

use crate::{crypto::timing_safe_eq, error::create_error_response, AppState};

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Errors that can occur during admin authentication.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// The provided token does not match.
    InvalidToken,
    /// The Authorization header is missing from the request.
    MissingHeader,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let reason = match self {
            Self::InvalidToken => "invalid admin token",
            Self::MissingHeader => "missing Authorization header",
        };

        create_error_response(&BeaconError::unauthorized(reason))
    }
}

/// Axum middleware that guards administrative routes.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(expected) = state.auth.admin_token.as_deref() {
        let provided = extract_bearer_token(req.headers()).ok_or_else(|| {
            warn!(path = %req.uri().path(), "Admin request without bearer token");
            AuthError::MissingHeader
        })?;

        if !timing_safe_eq(provided, expected) {
            warn!(path = %req.uri().path(), "Admin request with invalid token");
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(next.run(req).await)
}
