//! Validated client identity.
//!
//! [`ClientId`] is a newtype over the opaque identity string supplied once
//! per session. Construction rejects empty and whitespace-only input, so a
//! held `ClientId` is always a usable identity; the inner value is never
//! transformed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Opaque, non-blank client identity.
///
/// Immutable for the lifetime of a session. Appears as the `id` query
/// parameter on the transport address and as the `user` field on echoed
/// chat messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Creates a `ClientId`, validating the input.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidIdentity`] if the input is empty or
    /// contains only whitespace. The input is stored as supplied.
    pub fn new(raw: impl Into<String>) -> Result<Self, ClientError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ClientError::InvalidIdentity);
        }
        Ok(Self(raw))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ClientError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
