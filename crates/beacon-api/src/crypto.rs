//! Webhook signature generation and validation.
//!
//! The messaging platform signs every webhook body with HMAC-SHA256 keyed by
//! the channel secret and sends the base64-encoded digest in a header.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Result of signature validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the signature is valid.
    pub is_valid: bool,
    /// Error message if validation failed.
    pub error_message: Option<String>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn valid() -> Self {
        Self { is_valid: true, error_message: None }
    }

    /// Creates a failed validation result with error message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self { is_valid: false, error_message: Some(message.into()) }
    }
}

/// Signature validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Missing signature header.
    MissingSignature,
    /// Signature is not valid base64.
    InvalidFormat(String),
    /// Signature verification failed.
    VerificationFailed,
    /// Invalid secret key.
    InvalidSecret,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSignature => write!(f, "signature header missing"),
            Self::InvalidFormat(reason) => write!(f, "invalid signature format: {reason}"),
            Self::VerificationFailed => write!(f, "signature verification failed"),
            Self::InvalidSecret => write!(f, "invalid secret key"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// Validates a base64 HMAC-SHA256 signature of `payload`.
///
/// The digest comparison runs in constant time.
///
/// # Example
///
/// ```
/// use beacon_api::crypto::{generate_signature, validate_signature};
///
/// let payload = br#"{"destination":"U0","events":[]}"#;
/// let signature = generate_signature(payload, "channel-secret").unwrap();
///
/// assert!(validate_signature(payload, &signature, "channel-secret").is_valid);
/// assert!(!validate_signature(payload, &signature, "other-secret").is_valid);
/// ```
pub fn validate_signature(payload: &[u8], signature: &str, secret: &str) -> ValidationResult {
    match verify(payload, signature, secret) {
        Ok(()) => ValidationResult::valid(),
        Err(err) => ValidationResult::invalid(err.to_string()),
    }
}

fn verify(payload: &[u8], signature: &str, secret: &str) -> Result<(), SignatureError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if secret.is_empty() {
        return Err(SignatureError::InvalidSecret);
    }

    let provided =
        STANDARD.decode(signature).map_err(|e| SignatureError::InvalidFormat(e.to_string()))?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(payload);
    mac.verify_slice(&provided).map_err(|_| SignatureError::VerificationFailed)
}

/// Generates the base64 HMAC-SHA256 signature of `payload`.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is empty.
pub fn generate_signature(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::InvalidSecret);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(payload);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison.
pub(crate) fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
