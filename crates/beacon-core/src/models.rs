//! Core domain models and strongly-typed identifiers.
//!
//! Defines the subscriber identifier issued by the messaging platform and the
//! broadcast message shapes together with the validation rules applied
//! before any delivery is attempted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BeaconError;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Maximum length of a text message accepted by the platform.
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Maximum length of a rich message's alternative text.
pub const MAX_ALT_TEXT_LENGTH: usize = 400;

/// Opaque identifier of one recipient, issued by the messaging platform.
///
/// The registry never holds two entries with the same identifier.
///
/// # Example
///
/// ```
/// use beacon_core::models::SubscriberId;
/// let id = SubscriberId::from("U4af4980629");
/// assert_eq!(id.as_str(), "U4af4980629");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    /// Creates an identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl sqlx::Type<PgDb> for SubscriberId {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for SubscriberId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let id = <String as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(id))
    }
}

impl sqlx::Encode<'_, PgDb> for SubscriberId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Outbound message, serialized in the platform's wire shape.
///
/// Rich messages carry an opaque layout document plus the alternative text
/// shown where the card cannot be rendered (notifications, old clients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Plain text.
    Text {
        /// Message body
        text: String,
    },
    /// Rich card.
    #[serde(rename = "flex")]
    Rich {
        /// Accessibility summary
        #[serde(rename = "altText")]
        alt_text: String,
        /// Card layout document
        contents: serde_json::Value,
    },
}

impl Message {
    /// Creates a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a rich message.
    pub fn rich(contents: serde_json::Value, alt_text: impl Into<String>) -> Self {
        Self::Rich { contents, alt_text: alt_text.into() }
    }

    /// Short label used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Rich { .. } => "rich",
        }
    }

    /// Checks the message against platform constraints.
    ///
    /// # Errors
    ///
    /// Returns `BeaconError::InvalidPayload` when text is blank or too long,
    /// when a rich message lacks its alternative text, or when the card
    /// layout is not an object with a `type` field.
    pub fn validate(&self) -> Result<(), BeaconError> {
        match self {
            Self::Text { text } => {
                if text.trim().is_empty() {
                    return Err(BeaconError::invalid_payload("text message is empty"));
                }
                if text.chars().count() > MAX_TEXT_LENGTH {
                    return Err(BeaconError::invalid_payload(format!(
                        "text message exceeds {MAX_TEXT_LENGTH} characters"
                    )));
                }
            },
            Self::Rich { alt_text, contents } => {
                if alt_text.trim().is_empty() {
                    return Err(BeaconError::invalid_payload("rich message requires altText"));
                }
                if alt_text.chars().count() > MAX_ALT_TEXT_LENGTH {
                    return Err(BeaconError::invalid_payload(format!(
                        "altText exceeds {MAX_ALT_TEXT_LENGTH} characters"
                    )));
                }
                let has_type = contents
                    .as_object()
                    .and_then(|object| object.get("type"))
                    .is_some_and(serde_json::Value::is_string);
                if !has_type {
                    return Err(BeaconError::invalid_payload(
                        "rich message contents must be an object with a type field",
                    ));
                }
            },
        }

        Ok(())
    }
}

/// Message as supplied by an administrative caller.
///
/// Either a bare string (text) or a rich card object. Fields of the card are
/// optional here so that a missing summary is reported as an invalid payload
/// rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    /// Bare string.
    Text(String),
    /// Rich card object.
    Rich {
        /// Card layout document
        contents: Option<serde_json::Value>,
        /// Accessibility summary
        #[serde(rename = "altText", alias = "alt_text")]
        alt_text: Option<String>,
    },
}

impl TryFrom<MessagePayload> for Message {
    type Error = BeaconError;

    fn try_from(payload: MessagePayload) -> Result<Self, Self::Error> {
        let message = match payload {
            MessagePayload::Text(text) => Self::Text { text },
            MessagePayload::Rich { contents, alt_text } => {
                let contents = contents
                    .ok_or_else(|| BeaconError::invalid_payload("rich message requires contents"))?;
                let alt_text = alt_text
                    .ok_or_else(|| BeaconError::invalid_payload("rich message requires altText"))?;
                Self::Rich { contents, alt_text }
            },
        };

        message.validate()?;
        Ok(message)
    }
}
