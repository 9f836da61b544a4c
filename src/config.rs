//! Client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Defaults mirror the reference client
//! of the chat protocol: a `1s,2s,5s,10s,30s` backoff schedule, five
//! reconnection attempts, and a 30-second heartbeat.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;

/// Default backoff schedule in milliseconds.
const DEFAULT_RECONNECT_INTERVALS_MS: [u64; 5] = [1_000, 2_000, 5_000, 10_000, 30_000];

/// Top-level client configuration.
///
/// Loaded once at startup via [`ClientConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat server (e.g. `ws://localhost:8420/ws`).
    pub server_url: String,

    /// Ascending backoff schedule for reconnection attempts.
    pub reconnect_intervals: Vec<Duration>,

    /// Maximum automatic reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Interval between heartbeat probes while connected.
    pub heartbeat_interval: Duration,

    /// Capacity of the offline pending-message queue.
    pub pending_queue_capacity: usize,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Path of the persisted identity record.
    pub identity_file: PathBuf,
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the server URL is not a
    /// WebSocket URL or the backoff schedule fails validation.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let server_url =
            std::env::var("CHAT_SERVER_URL").unwrap_or_else(|_| "ws://localhost:8420/ws".to_string());

        let reconnect_intervals = std::env::var("RECONNECT_INTERVALS_MS")
            .ok()
            .and_then(|v| parse_intervals(&v))
            .unwrap_or_else(default_intervals);

        let max_reconnect_attempts = parse_env("MAX_RECONNECT_ATTEMPTS", 5);
        let heartbeat_interval = Duration::from_secs(parse_env("HEARTBEAT_INTERVAL_SECS", 30));
        let pending_queue_capacity = parse_env("PENDING_QUEUE_CAPACITY", 256);
        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 1_024);

        let identity_file = PathBuf::from(
            std::env::var("IDENTITY_FILE").unwrap_or_else(|_| ".chatwire/identity.json".to_string()),
        );

        let config = Self {
            server_url,
            reconnect_intervals,
            max_reconnect_attempts,
            heartbeat_interval,
            pending_queue_capacity,
            event_bus_capacity,
            identity_file,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the server URL has no
    /// WebSocket scheme, the backoff schedule is empty, or the schedule
    /// is not non-decreasing.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            return Err(ClientError::InvalidConfig(format!(
                "server URL must use ws:// or wss://, got {}",
                self.server_url
            )));
        }
        if self.reconnect_intervals.is_empty() {
            return Err(ClientError::InvalidConfig(
                "backoff schedule must not be empty".to_string(),
            ));
        }
        if self
            .reconnect_intervals
            .windows(2)
            .any(|pair| pair.first() > pair.last())
        {
            return Err(ClientError::InvalidConfig(
                "backoff schedule must be non-decreasing".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8420/ws".to_string(),
            reconnect_intervals: default_intervals(),
            max_reconnect_attempts: 5,
            heartbeat_interval: Duration::from_secs(30),
            pending_queue_capacity: 256,
            event_bus_capacity: 1_024,
            identity_file: PathBuf::from(".chatwire/identity.json"),
        }
    }
}

/// Returns the default backoff schedule.
fn default_intervals() -> Vec<Duration> {
    DEFAULT_RECONNECT_INTERVALS_MS
        .iter()
        .map(|ms| Duration::from_millis(*ms))
        .collect()
}

/// Parses a comma-separated list of millisecond values into durations.
/// Returns `None` on any non-numeric entry or an empty list.
fn parse_intervals(raw: &str) -> Option<Vec<Duration>> {
    let intervals: Vec<Duration> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().map(Duration::from_millis))
        .collect::<Result<_, _>>()
        .ok()?;
    if intervals.is_empty() { None } else { Some(intervals) }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconnect_intervals.len(), 5);
        assert_eq!(
            config.reconnect_intervals.last().copied(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn non_websocket_url_rejected() {
        let config = ClientConfig {
            server_url: "http://localhost:8420/ws".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn decreasing_schedule_rejected() {
        let config = ClientConfig {
            reconnect_intervals: vec![Duration::from_secs(5), Duration::from_secs(1)],
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_schedule_rejected() {
        let config = ClientConfig {
            reconnect_intervals: Vec::new(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_intervals_accepts_csv() {
        let parsed = parse_intervals("100, 200,500");
        assert_eq!(
            parsed,
            Some(vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(500),
            ])
        );
    }

    #[test]
    fn parse_intervals_rejects_garbage() {
        assert_eq!(parse_intervals("100,fast,500"), None);
        assert_eq!(parse_intervals(""), None);
    }
}
