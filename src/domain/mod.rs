//! Domain layer: identity, lifecycle phases, session state, and events.
//!
//! This module contains the client-side domain model: the validated
//! identity, the connection phase enum, the mutable session state with
//! its pending-message buffer, and the event bus that decouples the
//! session core from presentation code.

pub mod client_event;
pub mod client_id;
pub mod connection_state;
pub mod event_bus;
pub mod pending_queue;
pub mod phase;

pub use client_event::ClientEvent;
pub use client_id::ClientId;
pub use connection_state::ConnectionState;
pub use event_bus::EventBus;
pub use pending_queue::{PendingQueue, QueuedMessage};
pub use phase::ConnectionPhase;
