//! Session events published on the [`super::EventBus`].
//!
//! Every observable change in the connection lifecycle, and every
//! forwarded chat message, is a [`ClientEvent`]. Subscribers (the terminal
//! renderer, tests, any future surface) react to these without touching
//! the transport.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ConnectionPhase;

/// Event emitted by the session core.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The lifecycle phase changed. Fired exactly once per transition,
    /// after the state is updated.
    ConnectionStateChanged {
        /// Phase before the transition.
        from: ConnectionPhase,
        /// Phase after the transition.
        to: ConnectionPhase,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The transport opened and the session is live.
    Connected {
        /// Open timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A chat message arrived and passed validation.
    MessageReceived {
        /// Sender identity as reported by the server.
        user: String,
        /// Message body.
        message: String,
        /// Arrival timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Automatic reconnection gave up; an external `connect()` is needed.
    MaxReconnectAttemptsReached {
        /// Attempt counter at the moment of giving up.
        attempts: u32,
        /// Give-up timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ConnectionStateChanged { .. } => "connection_state_changed",
            Self::Connected { .. } => "connected",
            Self::MessageReceived { .. } => "message_received",
            Self::MaxReconnectAttemptsReached { .. } => "max_reconnect_attempts_reached",
        }
    }
}
