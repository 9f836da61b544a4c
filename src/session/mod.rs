//! Session layer: backoff policy, lifecycle state machine, and the
//! connection manager task.
//!
//! The machine is pure; the manager owns the transport and timers and is
//! the single writer of the session state.

pub mod backoff;
pub mod machine;
pub mod manager;

pub use backoff::{BackoffSchedule, RetryPolicy};
pub use manager::{ConnectionHandle, ConnectionManager, SendOutcome, SessionSettings};
