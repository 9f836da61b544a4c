//! Wire frame types: outbound control frames and inbound classification.
//!
//! Outbound chat messages are plain text and never pass through these
//! types. Control traffic and everything inbound is JSON: recognized
//! inbound tags are `heartbeat` and `system` (both consumed silently by
//! the session), and untagged chat frames carry `user` and `mensaje`.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Outbound control frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Periodic liveness probe: `{"type":"heartbeat"}`.
    Heartbeat,
}

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Server-side liveness probe; consumed, never forwarded.
    Heartbeat,
    /// Server housekeeping notice; consumed, never forwarded.
    System,
    /// A chat message to forward to subscribers.
    Chat {
        /// Sender identity.
        user: String,
        /// Message body.
        message: String,
    },
}

/// Raw inbound shape prior to classification.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    user: Option<String>,
    mensaje: Option<String>,
}

/// Parses and classifies an inbound text frame.
///
/// # Errors
///
/// Returns [`ClientError::MalformedMessage`] for non-JSON payloads,
/// unrecognized control tags, and chat frames whose required fields are
/// missing or blank.
pub fn classify(text: &str) -> Result<Inbound, ClientError> {
    let raw: RawFrame = serde_json::from_str(text)
        .map_err(|e| ClientError::MalformedMessage(format!("invalid JSON: {e}")))?;

    match raw.kind.as_deref() {
        Some("heartbeat") => Ok(Inbound::Heartbeat),
        Some("system") => Ok(Inbound::System),
        Some(other) => Err(ClientError::MalformedMessage(format!(
            "unrecognized control tag {other:?}"
        ))),
        None => {
            let user = raw.user.filter(|u| !u.trim().is_empty());
            let message = raw.mensaje.filter(|m| !m.trim().is_empty());
            match (user, message) {
                (Some(user), Some(message)) => Ok(Inbound::Chat { user, message }),
                _ => Err(ClientError::MalformedMessage(
                    "chat frame requires non-blank user and mensaje".to_string(),
                )),
            }
        }
    }
}
