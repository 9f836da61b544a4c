//! Connection lifecycle phases.

use serde::Serialize;

/// Discrete stage of the connection lifecycle.
///
/// Transitions between phases happen only through the session state
/// machine; no other component sets the phase directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// No transport; nothing scheduled. Initial phase.
    Disconnected,
    /// A transport open is in flight.
    Connecting,
    /// Transport is open and live.
    Connected,
    /// Waiting out a backoff delay before the next open.
    Reconnecting,
}

impl ConnectionPhase {
    /// Returns the phase as an uppercase static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
        }
    }
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
