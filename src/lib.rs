//! # chatwire
//!
//! Resilient WebSocket chat client: a finite-state connection lifecycle
//! with automatic, backoff-bounded reconnection, heartbeat liveness
//! probing, and offline message buffering with replay-on-reconnect.
//!
//! ## Architecture
//!
//! ```text
//! Terminal (console/)
//!     │
//!     ├── ConnectionHandle (session/)
//!     │       │
//!     │       └── ConnectionManager task
//!     │               ├── machine (pure transitions)
//!     │               ├── ConnectionState (domain/)
//!     │               └── Transport (ws/)
//!     │
//!     ├── EventBus (domain/)
//!     │
//!     └── IdentityStore (persistence/)
//! ```
//!
//! The session task is the single writer of [`domain::ConnectionState`]
//! and the only owner of the transport; everything else observes through
//! the [`domain::EventBus`] and the phase watch channel.

pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod session;
pub mod ws;
