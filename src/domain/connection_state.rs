//! Single source of truth for the session lifecycle.
//!
//! [`ConnectionState`] holds the phase, retry counters, last-connected
//! timestamp, and the pending-message buffer. It is owned and mutated
//! exclusively by the session task; every other component observes it
//! through the phase watch channel or the events published on the bus.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::{ClientEvent, ConnectionPhase, EventBus, PendingQueue};

/// Mutable session state behind the connection manager.
#[derive(Debug)]
pub struct ConnectionState {
    phase: ConnectionPhase,
    reconnect_attempts: u32,
    last_connected_at: Option<DateTime<Utc>>,
    pending: PendingQueue,
    bus: EventBus,
    phase_tx: watch::Sender<ConnectionPhase>,
}

impl ConnectionState {
    /// Creates fresh state in the `Disconnected` phase.
    ///
    /// Returns the state together with a watch receiver from which other
    /// components read consistent phase snapshots.
    #[must_use]
    pub fn new(bus: EventBus, queue_capacity: usize) -> (Self, watch::Receiver<ConnectionPhase>) {
        let (phase_tx, phase_rx) = watch::channel(ConnectionPhase::Disconnected);
        let state = Self {
            phase: ConnectionPhase::Disconnected,
            reconnect_attempts: 0,
            last_connected_at: None,
            pending: PendingQueue::new(queue_capacity),
            bus,
            phase_tx,
        };
        (state, phase_rx)
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Moves to a new phase, publishing `ConnectionStateChanged` exactly
    /// once per actual transition, after the field is updated. A no-op
    /// when the phase is unchanged.
    pub(crate) fn set_phase(&mut self, to: ConnectionPhase) {
        if to == self.phase {
            return;
        }
        let from = self.phase;
        self.phase = to;
        self.phase_tx.send_replace(to);
        tracing::info!(%from, %to, "connection state changed");
        self.bus.publish(ClientEvent::ConnectionStateChanged {
            from,
            to,
            timestamp: Utc::now(),
        });
    }

    /// Returns the reconnection attempt counter.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub(crate) fn set_reconnect_attempts(&mut self, attempts: u32) {
        self.reconnect_attempts = attempts;
    }

    /// Returns when the transport last opened successfully, if ever.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        self.last_connected_at
    }

    /// Records a successful open.
    pub(crate) fn mark_connected(&mut self) {
        self.last_connected_at = Some(Utc::now());
    }

    /// Returns the number of buffered outbound messages.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pending_mut(&mut self) -> &mut PendingQueue {
        &mut self.pending
    }
}
