//! WebSocket transport wrapper.
//!
//! [`Transport`] owns the socket for the lifetime of one connection and
//! reduces the tungstenite message stream to the three events the session
//! cares about: a text frame, a close (clean or not), or a failure.
//! Ping/pong and binary frames are handled below this layer or ignored.

use futures_util::{SinkExt, StreamExt};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::messages::ControlFrame;
use crate::domain::ClientId;
use crate::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event surfaced to the session by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Frame(String),
    /// The peer closed the connection. `clean` is `true` only for a
    /// close frame carrying the normal-closure code.
    Closed {
        /// Whether the close was an intentional, normal shutdown.
        clean: bool,
    },
    /// The socket failed; the connection is unusable.
    Failed(String),
}

/// An open WebSocket connection to the chat server.
#[derive(Debug)]
pub struct Transport {
    stream: WsStream,
}

impl Transport {
    /// Builds the connection address for an identity: the base endpoint
    /// with the percent-encoded identity as the `id` query parameter.
    #[must_use]
    pub fn endpoint_for(base: &str, client_id: &ClientId) -> String {
        let encoded = utf8_percent_encode(client_id.as_str(), NON_ALPHANUMERIC);
        format!("{base}?id={encoded}")
    }

    /// Opens a WebSocket connection for the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportOpen`] if the TCP connect or the
    /// WebSocket handshake fails.
    pub async fn open(base: &str, client_id: &ClientId) -> Result<Self, ClientError> {
        let url = Self::endpoint_for(base, client_id);
        tracing::debug!(%url, "opening transport");
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(ClientError::TransportOpen)?;
        Ok(Self { stream })
    }

    /// Waits for the next meaningful transport event.
    pub async fn next_event(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Frame(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(frame))) => {
                    let clean = frame.as_ref().is_some_and(|f| f.code == CloseCode::Normal);
                    return TransportEvent::Closed { clean };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return TransportEvent::Failed(e.to_string()),
                None => return TransportEvent::Closed { clean: false },
            }
        }
    }

    /// Transmits a chat message as a plain-text frame.
    ///
    /// # Errors
    ///
    /// Returns the underlying socket error; the caller routes it into the
    /// failure path of the session state machine.
    pub async fn send_text(
        &mut self,
        body: &str,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        self.stream.send(Message::text(body)).await
    }

    /// Transmits a JSON control frame.
    ///
    /// # Errors
    ///
    /// Returns the underlying socket error; the caller routes it into the
    /// failure path of the session state machine.
    pub async fn send_control(
        &mut self,
        frame: &ControlFrame,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let json = serde_json::to_string(frame).unwrap_or_default();
        self.stream.send(Message::text(json)).await
    }

    /// Closes the connection with a normal-closure frame, best effort.
    pub async fn close_normal(mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        };
        if let Err(e) = self.stream.send(Message::Close(Some(frame))).await {
            tracing::debug!(error = %e, "close frame not delivered");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ClientId {
        let Ok(id) = ClientId::new(raw) else {
            panic!("valid identity");
        };
        id
    }

    #[test]
    fn endpoint_appends_identity_parameter() {
        let url = Transport::endpoint_for("ws://localhost:8420/ws", &id("alice"));
        assert_eq!(url, "ws://localhost:8420/ws?id=alice");
    }

    #[test]
    fn endpoint_percent_encodes_identity() {
        let url = Transport::endpoint_for("ws://localhost:8420/ws", &id("ana maría"));
        assert_eq!(url, "ws://localhost:8420/ws?id=ana%20mar%C3%ADa");
    }

    #[test]
    fn endpoint_escapes_query_metacharacters() {
        let url = Transport::endpoint_for("ws://localhost:8420/ws", &id("a&b=c"));
        assert!(!url.contains("a&b"));
        assert!(url.contains("%26"));
        assert!(url.contains("%3D"));
    }
}
