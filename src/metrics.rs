//! Passive session counters.
//!
//! [`SessionMetrics`] is a set of atomic counters fed by the session
//! layer. Nothing in the connection lifecycle reads them back; they exist
//! for observability only and are logged as a snapshot at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for a single client session.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Transport opens attempted.
    pub connection_attempts: AtomicU64,
    /// Transport opens that completed the handshake.
    pub successful_connections: AtomicU64,
    /// Transport opens or live connections that failed.
    pub failed_connections: AtomicU64,
    /// Reconnection attempts scheduled.
    pub reconnections_scheduled: AtomicU64,
    /// Chat messages transmitted (including queue replays).
    pub messages_sent: AtomicU64,
    /// Chat messages received and forwarded.
    pub messages_received: AtomicU64,
    /// Messages buffered while offline.
    pub messages_queued: AtomicU64,
    /// Buffered messages evicted by the queue bound.
    pub messages_dropped: AtomicU64,
}

impl SessionMetrics {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a counter by one.
    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            successful_connections: self.successful_connections.load(Ordering::Relaxed),
            failed_connections: self.failed_connections.load(Ordering::Relaxed),
            reconnections_scheduled: self.reconnections_scheduled.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value copy of [`SessionMetrics`] for logging and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Transport opens attempted.
    pub connection_attempts: u64,
    /// Transport opens that completed the handshake.
    pub successful_connections: u64,
    /// Transport opens or live connections that failed.
    pub failed_connections: u64,
    /// Reconnection attempts scheduled.
    pub reconnections_scheduled: u64,
    /// Chat messages transmitted.
    pub messages_sent: u64,
    /// Chat messages received and forwarded.
    pub messages_received: u64,
    /// Messages buffered while offline.
    pub messages_queued: u64,
    /// Buffered messages evicted by the queue bound.
    pub messages_dropped: u64,
}
