//! Session task and its command handle.
//!
//! [`ConnectionManager`] is the only component that touches the transport
//! and the only writer of [`ConnectionState`]. It runs as a single task:
//! commands, transport frames, heartbeat ticks, and the reconnection
//! timer all arrive through one `select!` loop, and each is handled to
//! completion before the next fires. Lifecycle decisions are delegated to
//! the pure transition function in [`super::machine`]; this task merely
//! executes the effects it returns.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, Sleep, interval_at, sleep};

use crate::config::ClientConfig;
use crate::domain::{ClientEvent, ClientId, ConnectionPhase, ConnectionState, EventBus};
use crate::error::ClientError;
use crate::metrics::SessionMetrics;
use crate::ws::messages::{self, ControlFrame, Inbound};
use crate::ws::transport::{Transport, TransportEvent};

use super::backoff::{BackoffSchedule, RetryPolicy};
use super::machine::{self, Effect, Input};

/// Result of a `send` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message went out over the open transport.
    Sent,
    /// No live transport; the message was buffered for replay. This is a
    /// deferred-delivery signal, not an error.
    Queued,
}

impl SendOutcome {
    /// Returns `true` if the message was buffered rather than sent.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// Everything the session task needs to run, extracted from the client
/// configuration once at startup.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Base WebSocket endpoint; the identity is appended as a query
    /// parameter at open time.
    pub endpoint: String,
    /// Backoff schedule and attempt ceiling.
    pub retry: RetryPolicy,
    /// Interval between heartbeat probes while connected.
    pub heartbeat_interval: Duration,
    /// Capacity of the pending-message buffer.
    pub queue_capacity: usize,
}

impl SessionSettings {
    /// Builds session settings from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the backoff schedule
    /// fails validation.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: config.server_url.clone(),
            retry: RetryPolicy {
                schedule: BackoffSchedule::new(config.reconnect_intervals.clone())?,
                max_attempts: config.max_reconnect_attempts,
            },
            heartbeat_interval: config.heartbeat_interval,
            queue_capacity: config.pending_queue_capacity,
        })
    }
}

/// Command sent from a [`ConnectionHandle`] to the session task.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Send {
        body: String,
        reply: oneshot::Sender<SendOutcome>,
    },
}

/// Cloneable handle for driving a session task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::Sender<Command>,
    phase_rx: watch::Receiver<ConnectionPhase>,
}

impl ConnectionHandle {
    /// Requests a connection. A no-op while one is in flight or live;
    /// also re-arms the session after automatic reconnection gave up.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionEnded`] if the session task has
    /// stopped.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Connect)
            .await
            .map_err(|_| ClientError::SessionEnded)
    }

    /// Requests a clean shutdown of the connection. Buffered messages are
    /// kept for a later `connect()`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionEnded`] if the session task has
    /// stopped.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Disconnect)
            .await
            .map_err(|_| ClientError::SessionEnded)
    }

    /// Sends a chat message, or buffers it when there is no live
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionEnded`] if the session task has
    /// stopped.
    pub async fn send(&self, body: impl Into<String>) -> Result<SendOutcome, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                body: body.into(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ClientError::SessionEnded)?;
        reply_rx.await.map_err(|_| ClientError::SessionEnded)
    }

    /// Returns a snapshot of the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        *self.phase_rx.borrow()
    }
}

/// The session task: owns the transport, the state, and the timers.
#[derive(Debug)]
pub struct ConnectionManager {
    settings: SessionSettings,
    client_id: ClientId,
    state: ConnectionState,
    bus: EventBus,
    metrics: Arc<SessionMetrics>,
    transport: Option<Transport>,
    heartbeat: Option<Interval>,
    retry: Option<Pin<Box<Sleep>>>,
    commands: mpsc::Receiver<Command>,
}

impl ConnectionManager {
    /// Spawns a session task and returns the handle for driving it.
    ///
    /// The task stops, closing any open transport, when every handle has
    /// been dropped.
    #[must_use]
    pub fn spawn(
        settings: SessionSettings,
        client_id: ClientId,
        bus: EventBus,
        metrics: Arc<SessionMetrics>,
    ) -> ConnectionHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (state, phase_rx) = ConnectionState::new(bus.clone(), settings.queue_capacity);
        let manager = Self {
            settings,
            client_id,
            state,
            bus,
            metrics,
            transport: None,
            heartbeat: None,
            retry: None,
            commands: command_rx,
        };
        tokio::spawn(manager.run());
        ConnectionHandle {
            commands: command_tx,
            phase_rx,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.dispatch(Input::DisconnectRequested).await;
                        break;
                    }
                },
                event = next_transport_event(&mut self.transport) => {
                    self.handle_transport_event(event).await;
                }
                () = next_heartbeat_tick(&mut self.heartbeat) => {
                    self.on_heartbeat_tick().await;
                }
                () = retry_elapsed(&mut self.retry) => {
                    self.retry = None;
                    self.dispatch(Input::RetryElapsed).await;
                }
            }
        }
        tracing::debug!("session task finished");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let phase = self.state.phase();
                if matches!(
                    phase,
                    ConnectionPhase::Connecting | ConnectionPhase::Connected
                ) {
                    tracing::warn!(%phase, "connect requested while already active");
                }
                self.dispatch(Input::ConnectRequested).await;
            }
            Command::Disconnect => {
                tracing::info!("disconnect requested");
                self.dispatch(Input::DisconnectRequested).await;
            }
            Command::Send { body, reply } => {
                let outcome = self.send_or_queue(body).await;
                let _ = reply.send(outcome);
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Frame(text) => self.handle_frame(&text),
            TransportEvent::Closed { clean } => {
                tracing::info!(clean, "transport closed");
                self.dispatch(Input::TransportClosed { clean }).await;
            }
            TransportEvent::Failed(error) => {
                tracing::warn!(%error, "transport failed");
                SessionMetrics::increment(&self.metrics.failed_connections);
                self.dispatch(Input::TransportError).await;
            }
        }
    }

    /// Runs machine transitions to quiescence, starting from `input`.
    /// Applying an effect (a transport open, a queue drain) can itself
    /// produce the next input; the loop continues until none does.
    async fn dispatch(&mut self, input: Input) {
        let mut pending = Some(input);
        while let Some(input) = pending.take() {
            let before = self.state.phase();
            let step = machine::step(
                before,
                self.state.reconnect_attempts(),
                &self.settings.retry,
                input,
            );
            self.state.set_reconnect_attempts(step.attempts);
            if step.phase == ConnectionPhase::Connected && before != ConnectionPhase::Connected {
                self.state.mark_connected();
                SessionMetrics::increment(&self.metrics.successful_connections);
            }
            self.state.set_phase(step.phase);
            for effect in step.effects {
                if let Some(follow_up) = self.apply(effect).await {
                    pending = Some(follow_up);
                }
            }
        }
    }

    async fn apply(&mut self, effect: Effect) -> Option<Input> {
        match effect {
            Effect::OpenTransport => {
                SessionMetrics::increment(&self.metrics.connection_attempts);
                tracing::info!(endpoint = %self.settings.endpoint, "opening connection");
                match Transport::open(&self.settings.endpoint, &self.client_id).await {
                    Ok(transport) => {
                        self.transport = Some(transport);
                        Some(Input::OpenSucceeded)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "connection open failed");
                        SessionMetrics::increment(&self.metrics.failed_connections);
                        Some(Input::OpenFailed)
                    }
                }
            }
            Effect::CloseTransport => {
                if let Some(transport) = self.transport.take() {
                    transport.close_normal().await;
                }
                None
            }
            Effect::DropTransport => {
                self.transport = None;
                None
            }
            Effect::StartHeartbeat => {
                let period = self.settings.heartbeat_interval;
                self.heartbeat = Some(interval_at(Instant::now() + period, period));
                None
            }
            Effect::StopHeartbeat => {
                self.heartbeat = None;
                None
            }
            Effect::DrainQueue => self.drain_queue().await,
            Effect::ScheduleRetry(delay) => {
                SessionMetrics::increment(&self.metrics.reconnections_scheduled);
                tracing::info!(
                    ?delay,
                    attempt = self.state.reconnect_attempts(),
                    "reconnection scheduled"
                );
                self.retry = Some(Box::pin(sleep(delay)));
                None
            }
            Effect::CancelRetry => {
                if self.retry.take().is_some() {
                    tracing::debug!("pending reconnection cancelled");
                }
                None
            }
            Effect::PublishConnected => {
                tracing::info!("connection established");
                self.bus.publish(ClientEvent::Connected {
                    timestamp: Utc::now(),
                });
                None
            }
            Effect::PublishRetriesExhausted => {
                tracing::error!(
                    attempts = self.state.reconnect_attempts(),
                    "max reconnection attempts reached"
                );
                self.bus.publish(ClientEvent::MaxReconnectAttemptsReached {
                    attempts: self.state.reconnect_attempts(),
                    timestamp: Utc::now(),
                });
                None
            }
        }
    }

    /// Replays the pending queue over the open transport, oldest first.
    /// On a mid-drain failure the unsent message goes back to the front
    /// and the failure is routed into the machine.
    async fn drain_queue(&mut self) -> Option<Input> {
        while let Some(message) = self.state.pending_mut().dequeue() {
            let Some(transport) = self.transport.as_mut() else {
                self.state.pending_mut().requeue_front(message);
                return None;
            };
            match transport.send_text(&message.body).await {
                Ok(()) => {
                    SessionMetrics::increment(&self.metrics.messages_sent);
                    tracing::debug!(id = %message.id, "buffered message delivered");
                }
                Err(e) => {
                    tracing::warn!(id = %message.id, error = %e, "buffered delivery failed");
                    self.state.pending_mut().requeue_front(message);
                    return Some(Input::TransportError);
                }
            }
        }
        None
    }

    async fn send_or_queue(&mut self, body: String) -> SendOutcome {
        if self.state.phase() == ConnectionPhase::Connected
            && let Some(transport) = self.transport.as_mut()
        {
            match transport.send_text(&body).await {
                Ok(()) => {
                    SessionMetrics::increment(&self.metrics.messages_sent);
                    return SendOutcome::Sent;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "send failed, buffering message");
                    self.dispatch(Input::TransportError).await;
                }
            }
        }
        self.enqueue(body);
        SendOutcome::Queued
    }

    fn enqueue(&mut self, body: String) {
        let (id, evicted) = self.state.pending_mut().enqueue(body);
        SessionMetrics::increment(&self.metrics.messages_queued);
        tracing::debug!(%id, pending = self.state.pending_len(), "message buffered");
        if let Some(dropped) = evicted {
            SessionMetrics::increment(&self.metrics.messages_dropped);
            tracing::warn!(id = %dropped.id, "pending queue full, dropped oldest message");
        }
    }

    fn handle_frame(&mut self, text: &str) {
        match messages::classify(text) {
            Ok(Inbound::Heartbeat) => tracing::trace!("heartbeat received"),
            Ok(Inbound::System) => tracing::debug!("system frame consumed"),
            Ok(Inbound::Chat { user, message }) => {
                SessionMetrics::increment(&self.metrics.messages_received);
                tracing::debug!(from = %user, "message received");
                self.bus.publish(ClientEvent::MessageReceived {
                    user,
                    message,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => tracing::warn!(error = %e, raw = text, "dropping malformed frame"),
        }
    }

    async fn on_heartbeat_tick(&mut self) {
        if self.state.phase() != ConnectionPhase::Connected {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        match transport.send_control(&ControlFrame::Heartbeat).await {
            Ok(()) => tracing::trace!("heartbeat sent"),
            Err(e) => {
                tracing::warn!(error = %e, "heartbeat send failed");
                self.dispatch(Input::TransportError).await;
            }
        }
    }
}

/// Resolves to the next transport event, or never when no transport is
/// open.
async fn next_transport_event(transport: &mut Option<Transport>) -> TransportEvent {
    match transport {
        Some(transport) => transport.next_event().await,
        None => std::future::pending().await,
    }
}

/// Resolves on the next heartbeat tick, or never while disconnected.
async fn next_heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves when the armed reconnection timer fires, or never when no
/// timer is armed.
async fn retry_elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
