//! Terminal presentation adapter.
//!
//! Subscribes to the event bus to render chat and connection activity,
//! and reads stdin lines to submit outgoing messages and lifecycle
//! commands. Everything here sits strictly on top of the session API;
//! the transport is never touched directly.

use std::ops::ControlFlow;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::domain::{ClientEvent, ClientId};
use crate::session::{ConnectionHandle, SendOutcome};

/// Line-based terminal front end for a chat session.
///
/// Recognized commands: `/quit` (clean shutdown), `/connect` (manual
/// re-arm after automatic reconnection gave up), `/status` (current
/// phase). Any other non-empty line is sent as a chat message.
#[derive(Debug)]
pub struct Console {
    handle: ConnectionHandle,
    client_id: ClientId,
}

impl Console {
    /// Creates a console bound to a session handle.
    #[must_use]
    pub fn new(handle: ConnectionHandle, client_id: ClientId) -> Self {
        Self { handle, client_id }
    }

    /// Runs the renderer and the input loop until `/quit`, stdin EOF, or
    /// session termination.
    pub async fn run(self, events: broadcast::Receiver<ClientEvent>) {
        let renderer = tokio::spawn(render_events(events, self.client_id.clone()));

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if self.handle_line(line.trim()).await.is_break() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }

        renderer.abort();
    }

    async fn handle_line(&self, line: &str) -> ControlFlow<()> {
        match line {
            "" => ControlFlow::Continue(()),
            "/quit" => {
                let _ = self.handle.disconnect().await;
                ControlFlow::Break(())
            }
            "/connect" => {
                if self.handle.connect().await.is_err() {
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            "/status" => {
                println!("* connection: {}", self.handle.phase());
                ControlFlow::Continue(())
            }
            text => match self.handle.send(text).await {
                Ok(SendOutcome::Sent) => ControlFlow::Continue(()),
                Ok(SendOutcome::Queued) => {
                    println!("* offline; message buffered for delivery");
                    ControlFlow::Continue(())
                }
                Err(e) => {
                    tracing::warn!(error = %e, "send failed");
                    ControlFlow::Break(())
                }
            },
        }
    }
}

/// Prompts for a username until a non-blank one is entered.
///
/// Returns `None` on stdin EOF or a read failure.
pub async fn prompt_identity() -> Option<ClientId> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        print!("choose a username: ");
        let _ = std::io::Write::flush(&mut std::io::stdout());
        match lines.next_line().await {
            Ok(Some(line)) => match ClientId::new(line.trim()) {
                Ok(id) => return Some(id),
                Err(_) => println!("username cannot be empty"),
            },
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                return None;
            }
        }
    }
}

async fn render_events(mut events: broadcast::Receiver<ClientEvent>, client_id: ClientId) {
    loop {
        match events.recv().await {
            Ok(event) => render(&event, &client_id),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "renderer lagged behind event bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn render(event: &ClientEvent, client_id: &ClientId) {
    match event {
        ClientEvent::MessageReceived {
            user,
            message,
            timestamp,
        } => {
            let time = timestamp.format("%H:%M");
            if user == client_id.as_str() {
                println!("[{time}] {user} (you): {message}");
            } else {
                println!("[{time}] {user}: {message}");
            }
        }
        ClientEvent::ConnectionStateChanged { to, .. } => println!("* connection: {to}"),
        ClientEvent::Connected { .. } => println!("* connected"),
        ClientEvent::MaxReconnectAttemptsReached { .. } => {
            println!("* connection lost; type /connect to retry");
        }
    }
}
