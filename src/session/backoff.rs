//! Reconnection backoff schedule.
//!
//! A fixed ascending sequence of delays, indexed by the attempt counter.
//! The index clamps at the last entry, so the delay saturates at the
//! schedule's ceiling no matter how many attempts occur.

use std::time::Duration;

use crate::error::ClientError;

/// Fixed ascending backoff schedule.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    /// Creates a schedule from an ascending list of delays.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the list is empty or
    /// not non-decreasing.
    pub fn new(delays: Vec<Duration>) -> Result<Self, ClientError> {
        if delays.is_empty() {
            return Err(ClientError::InvalidConfig(
                "backoff schedule must not be empty".to_string(),
            ));
        }
        if delays.windows(2).any(|pair| pair.first() > pair.last()) {
            return Err(ClientError::InvalidConfig(
                "backoff schedule must be non-decreasing".to_string(),
            ));
        }
        Ok(Self { delays })
    }

    /// Returns the delay before the given reconnection attempt, clamped
    /// to the last schedule entry.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delays
            .get(attempt as usize)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns the schedule's longest delay.
    #[must_use]
    pub fn longest(&self) -> Duration {
        self.delays.last().copied().unwrap_or(Duration::ZERO)
    }
}

/// Retry policy for the session state machine: the backoff schedule plus
/// the attempt ceiling after which automatic reconnection stops.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay schedule, indexed by attempt and clamped at the last entry.
    pub schedule: BackoffSchedule,
    /// Maximum automatic attempts before giving up.
    pub max_attempts: u32,
}
