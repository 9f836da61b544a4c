//! Client error types.
//!
//! [`ClientError`] is the central error type for the crate. Transport and
//! parsing failures never propagate out of the session task as errors:
//! they are logged and converted into state-machine inputs. The variants
//! here cover what callers can actually observe.

/// Client-side error enum.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Identity string was empty or whitespace-only.
    #[error("identity must be a non-empty, non-blank string")]
    InvalidIdentity,

    /// Configuration failed validation at load time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// WebSocket construction or handshake failed.
    #[error("transport open failed: {0}")]
    TransportOpen(#[source] tokio_tungstenite::tungstenite::Error),

    /// Inbound payload failed required-field validation.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The session task has stopped; commands can no longer be delivered.
    #[error("session task has terminated")]
    SessionEnded,
}

impl ClientError {
    /// Returns `true` for failures the session recovers from on its own
    /// (by dropping the payload or scheduling a reconnection).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::TransportOpen(_) | Self::MalformedMessage(_))
    }
}
