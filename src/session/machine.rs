//! Pure lifecycle state machine.
//!
//! [`step`] maps the current phase, the attempt counter, and an input to
//! the next phase, the next counter, and a list of side effects. It never
//! touches a socket or a timer itself; the session manager is the only
//! effect interpreter. This keeps every lifecycle edge deterministic and
//! testable without a transport.

use std::time::Duration;

use crate::domain::ConnectionPhase;

use super::backoff::RetryPolicy;

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// `connect()` was called.
    ConnectRequested,
    /// `disconnect()` was called.
    DisconnectRequested,
    /// The transport open completed.
    OpenSucceeded,
    /// The transport open failed.
    OpenFailed,
    /// The live socket failed.
    TransportError,
    /// The peer closed the connection.
    TransportClosed {
        /// Whether the close carried the normal-closure code.
        clean: bool,
    },
    /// The scheduled reconnection delay elapsed.
    RetryElapsed,
}

/// Side effect requested by a transition, executed by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open the transport at the session's address.
    OpenTransport,
    /// Close the transport with a normal-closure frame, then drop it.
    CloseTransport,
    /// Drop the transport handle; the socket is already dead.
    DropTransport,
    /// Start the heartbeat interval.
    StartHeartbeat,
    /// Drop the heartbeat interval.
    StopHeartbeat,
    /// Replay the pending queue, oldest first, over the open transport.
    DrainQueue,
    /// Arm the reconnection timer for the given delay.
    ScheduleRetry(Duration),
    /// Drop any armed reconnection timer.
    CancelRetry,
    /// Publish the `Connected` event.
    PublishConnected,
    /// Publish the `MaxReconnectAttemptsReached` event.
    PublishRetriesExhausted,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Phase after the transition.
    pub phase: ConnectionPhase,
    /// Attempt counter after the transition.
    pub attempts: u32,
    /// Effects to execute, in order.
    pub effects: Vec<Effect>,
}

impl Step {
    fn stay(phase: ConnectionPhase, attempts: u32) -> Self {
        Self {
            phase,
            attempts,
            effects: Vec::new(),
        }
    }
}

/// Computes one transition of the lifecycle state machine.
#[must_use]
pub fn step(phase: ConnectionPhase, attempts: u32, policy: &RetryPolicy, input: Input) -> Step {
    use ConnectionPhase::{Connected, Connecting, Disconnected, Reconnecting};

    match (phase, input) {
        // connect() is a no-op while an open is in flight or live.
        (Connecting | Connected, Input::ConnectRequested) => Step::stay(phase, attempts),

        (Disconnected, Input::ConnectRequested) => Step {
            phase: Connecting,
            attempts,
            effects: vec![Effect::OpenTransport],
        },

        // connect() from Reconnecting re-arms immediately; the pending
        // timer is dropped rather than left to fire into a stale phase.
        (Reconnecting, Input::ConnectRequested) => Step {
            phase: Connecting,
            attempts,
            effects: vec![Effect::CancelRetry, Effect::OpenTransport],
        },

        (Connecting, Input::OpenSucceeded) => Step {
            phase: Connected,
            attempts: 0,
            effects: vec![
                Effect::StartHeartbeat,
                Effect::DrainQueue,
                Effect::PublishConnected,
            ],
        },

        (Connecting, Input::OpenFailed | Input::TransportError) => {
            reschedule(attempts, policy, false)
        }
        (Connecting, Input::TransportClosed { clean }) => {
            if clean {
                Step {
                    phase: Disconnected,
                    attempts,
                    effects: vec![Effect::DropTransport],
                }
            } else {
                reschedule(attempts, policy, false)
            }
        }

        (Connected, Input::TransportError) => reschedule(attempts, policy, true),
        (Connected, Input::TransportClosed { clean }) => {
            if clean {
                Step {
                    phase: Disconnected,
                    attempts,
                    effects: vec![Effect::StopHeartbeat, Effect::DropTransport],
                }
            } else {
                reschedule(attempts, policy, true)
            }
        }

        (Reconnecting, Input::RetryElapsed) => Step {
            phase: Connecting,
            attempts,
            effects: vec![Effect::OpenTransport],
        },

        (_, Input::DisconnectRequested) => Step {
            phase: Disconnected,
            attempts,
            effects: vec![
                Effect::StopHeartbeat,
                Effect::CancelRetry,
                Effect::CloseTransport,
            ],
        },

        // A timer firing in any other phase is stale; ignore it.
        (_, Input::RetryElapsed) => Step::stay(phase, attempts),

        // Remaining combinations (late transport events after a
        // disconnect, duplicate opens) carry no information.
        _ => Step::stay(phase, attempts),
    }
}

/// Reconnection scheduling: give up at the attempt ceiling, otherwise
/// move to `Reconnecting` with the next backoff delay.
fn reschedule(attempts: u32, policy: &RetryPolicy, from_connected: bool) -> Step {
    let mut effects = Vec::new();
    if from_connected {
        effects.push(Effect::StopHeartbeat);
    }
    effects.push(Effect::DropTransport);

    if attempts >= policy.max_attempts {
        effects.push(Effect::PublishRetriesExhausted);
        return Step {
            phase: ConnectionPhase::Disconnected,
            attempts,
            effects,
        };
    }

    effects.push(Effect::ScheduleRetry(policy.schedule.delay_for(attempts)));
    Step {
        phase: ConnectionPhase::Reconnecting,
        attempts: attempts.saturating_add(1),
        effects,
    }
}
