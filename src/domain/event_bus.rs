//! Broadcast channel for session events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The session
//! layer publishes every [`ClientEvent`] through the bus, and presentation
//! code subscribes to react without being coupled to the transport.

use tokio::sync::broadcast;

use super::ClientEvent;

/// Broadcast bus for [`ClientEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// Subscribers are isolated from each other: a slow receiver loses the
/// oldest events when the ring buffer fills, and a dropped or panicking
/// receiver never affects the publisher or the remaining subscribers.
/// Events are fire-and-forget; a receiver created after a publish never
/// sees that event.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Returns the number of receivers that got the event. With no active
    /// receivers the event is silently dropped.
    pub fn publish(&self, event: ClientEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will see all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
