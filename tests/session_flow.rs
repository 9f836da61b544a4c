//! End-to-end session scenarios against an in-process WebSocket server.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async, accept_hdr_async};

use chatwire::domain::{ClientEvent, ClientId, ConnectionPhase, EventBus};
use chatwire::metrics::SessionMetrics;
use chatwire::session::{
    BackoffSchedule, ConnectionHandle, ConnectionManager, RetryPolicy, SendOutcome,
    SessionSettings,
};

const EVENT_WAIT: Duration = Duration::from_secs(5);

fn client_id(raw: &str) -> ClientId {
    let Ok(id) = ClientId::new(raw) else {
        panic!("valid identity");
    };
    id
}

fn fast_settings(addr: SocketAddr) -> SessionSettings {
    let delays = vec![Duration::from_millis(50), Duration::from_millis(100)];
    let Ok(schedule) = BackoffSchedule::new(delays) else {
        panic!("valid schedule");
    };
    SessionSettings {
        endpoint: format!("ws://{addr}/ws"),
        retry: RetryPolicy {
            schedule,
            max_attempts: 5,
        },
        heartbeat_interval: Duration::from_secs(30),
        queue_capacity: 32,
    }
}

async fn bind() -> (SocketAddr, TcpListener) {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    (addr, listener)
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let Ok(Ok((stream, _))) = timeout(EVENT_WAIT, listener.accept()).await else {
        panic!("no client connected");
    };
    let Ok(Ok(ws)) = timeout(EVENT_WAIT, accept_async(stream)).await else {
        panic!("handshake failed");
    };
    ws
}

async fn read_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let Ok(Some(Ok(message))) = timeout(EVENT_WAIT, ws.next()).await else {
            panic!("no frame from client");
        };
        if let Message::Text(text) = message {
            return text.as_str().to_owned();
        }
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<ClientEvent>,
    mut predicate: impl FnMut(&ClientEvent) -> bool,
) -> ClientEvent {
    loop {
        let Ok(Ok(event)) = timeout(EVENT_WAIT, events.recv()).await else {
            panic!("expected event did not arrive");
        };
        if predicate(&event) {
            return event;
        }
    }
}

fn spawn_client(settings: SessionSettings, id: &str) -> (ConnectionHandle, EventBus) {
    let bus = EventBus::new(256);
    let metrics = Arc::new(SessionMetrics::new());
    let handle = ConnectionManager::spawn(settings, client_id(id), bus.clone(), metrics);
    (handle, bus)
}

#[tokio::test]
async fn offline_sends_replay_in_order_after_connect() {
    let (addr, listener) = bind().await;

    // Capture the handshake URI, then collect the replayed messages.
    let server = tokio::spawn(async move {
        let Ok(Ok((stream, _))) = timeout(EVENT_WAIT, listener.accept()).await else {
            panic!("no client connected");
        };
        let (uri_tx, uri_rx) = tokio::sync::oneshot::channel();
        let callback = move |request: &Request, response: Response| {
            let _ = uri_tx.send(request.uri().to_string());
            Ok(response)
        };
        let Ok(Ok(mut ws)) = timeout(EVENT_WAIT, accept_hdr_async(stream, callback)).await else {
            panic!("handshake failed");
        };
        let Ok(uri) = uri_rx.await else {
            panic!("uri not captured");
        };
        let mut bodies = Vec::new();
        for _ in 0..3 {
            bodies.push(read_text(&mut ws).await);
        }
        (uri, bodies)
    });

    let (handle, bus) = spawn_client(fast_settings(addr), "alice");
    let mut events = bus.subscribe();

    // Buffered while disconnected, in order.
    for body in ["one", "two", "three"] {
        let outcome = handle.send(body).await;
        assert_eq!(outcome.ok(), Some(SendOutcome::Queued));
    }

    assert!(handle.connect().await.is_ok());
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    let Ok(Ok((uri, bodies))) = timeout(EVENT_WAIT, server).await else {
        panic!("server task failed");
    };
    assert!(uri.contains("id=alice"), "uri was {uri}");
    assert_eq!(bodies, vec!["one", "two", "three"]);
    assert_eq!(handle.phase(), ConnectionPhase::Connected);
}

#[tokio::test]
async fn live_send_reaches_server_immediately() {
    let (addr, listener) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        read_text(&mut ws).await
    });

    let (handle, bus) = spawn_client(fast_settings(addr), "bob");
    let mut events = bus.subscribe();

    assert!(handle.connect().await.is_ok());
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    let outcome = handle.send("hola a todos").await;
    assert_eq!(outcome.ok(), Some(SendOutcome::Sent));

    let Ok(Ok(body)) = timeout(EVENT_WAIT, server).await else {
        panic!("server task failed");
    };
    assert_eq!(body, "hola a todos");
}

#[tokio::test]
async fn control_frames_are_consumed_and_chat_is_forwarded() {
    let (addr, listener) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        let frames = [
            "{\"type\":\"heartbeat\"}",
            "{\"type\":\"system\",\"detail\":\"ana joined\"}",
            "{\"user\":\"ana\",\"mensaje\":\"hola\"}",
        ];
        for frame in frames {
            let Ok(()) = ws.send(Message::text(frame)).await else {
                panic!("server send failed");
            };
        }
        // Keep the socket open until the test finishes.
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let (handle, bus) = spawn_client(fast_settings(addr), "carol");
    let mut events = bus.subscribe();

    assert!(handle.connect().await.is_ok());
    let event = wait_for(&mut events, |e| {
        matches!(e, ClientEvent::MessageReceived { .. })
    })
    .await;

    // The first forwarded message is the chat frame; the heartbeat and
    // system frames before it were consumed silently.
    let ClientEvent::MessageReceived { user, message, .. } = event else {
        panic!("expected a chat message");
    };
    assert_eq!(user, "ana");
    assert_eq!(message, "hola");

    // Nothing further is forwarded.
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, ClientEvent::MessageReceived { .. }),
            "unexpected extra chat message"
        );
    }

    server.abort();
}

#[tokio::test]
async fn heartbeat_probe_reaches_server_while_connected() {
    let (addr, listener) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        read_text(&mut ws).await
    });

    let mut settings = fast_settings(addr);
    settings.heartbeat_interval = Duration::from_millis(50);
    let (handle, bus) = spawn_client(settings, "dave");
    let mut events = bus.subscribe();

    assert!(handle.connect().await.is_ok());
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    let Ok(Ok(frame)) = timeout(EVENT_WAIT, server).await else {
        panic!("server task failed");
    };
    assert_eq!(frame, "{\"type\":\"heartbeat\"}");
}

#[tokio::test]
async fn unclean_drop_schedules_reconnect_and_replays_buffered_send() {
    let (addr, listener) = bind().await;
    let server = tokio::spawn(async move {
        // First connection: accept, then drop without a close frame.
        let ws = accept_ws(&listener).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(ws);
        // Second connection: receive the message buffered in between.
        let mut ws = accept_ws(&listener).await;
        read_text(&mut ws).await
    });

    let (handle, bus) = spawn_client(fast_settings(addr), "erin");
    let mut events = bus.subscribe();

    assert!(handle.connect().await.is_ok());
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    // The drop surfaces as an unclean loss and moves us to Reconnecting.
    wait_for(&mut events, |e| {
        matches!(
            e,
            ClientEvent::ConnectionStateChanged {
                to: ConnectionPhase::Reconnecting,
                ..
            }
        )
    })
    .await;

    let outcome = handle.send("late message").await;
    assert_eq!(outcome.ok(), Some(SendOutcome::Queued));

    // The retry fires, reconnects, and drains the buffer.
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    let Ok(Ok(body)) = timeout(EVENT_WAIT, server).await else {
        panic!("server task failed");
    };
    assert_eq!(body, "late message");
}

#[tokio::test]
async fn clean_close_disconnects_without_reconnecting() {
    let (addr, listener) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "server shutdown".into(),
        };
        let Ok(()) = ws.send(Message::Close(Some(frame))).await else {
            panic!("close send failed");
        };
        // Report whether anything reconnects afterwards.
        timeout(Duration::from_millis(500), listener.accept()).await.is_ok()
    });

    let (handle, bus) = spawn_client(fast_settings(addr), "frank");
    let mut events = bus.subscribe();

    assert!(handle.connect().await.is_ok());
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    wait_for(&mut events, |e| {
        matches!(
            e,
            ClientEvent::ConnectionStateChanged {
                to: ConnectionPhase::Disconnected,
                ..
            }
        )
    })
    .await;

    let Ok(Ok(reconnected)) = timeout(EVENT_WAIT, server).await else {
        panic!("server task failed");
    };
    assert!(!reconnected, "client must not reconnect after a clean close");
    assert_eq!(handle.phase(), ConnectionPhase::Disconnected);
}

#[tokio::test]
async fn disconnect_sends_normal_closure_to_server() {
    let (addr, listener) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        loop {
            let Ok(Some(Ok(message))) = timeout(EVENT_WAIT, ws.next()).await else {
                panic!("no close frame from client");
            };
            if let Message::Close(frame) = message {
                return frame.is_some_and(|f| f.code == CloseCode::Normal);
            }
        }
    });

    let (handle, bus) = spawn_client(fast_settings(addr), "grace");
    let mut events = bus.subscribe();

    assert!(handle.connect().await.is_ok());
    wait_for(&mut events, |e| {
        matches!(e, ClientEvent::Connected { .. })
    })
    .await;

    assert!(handle.disconnect().await.is_ok());

    let Ok(Ok(normal)) = timeout(EVENT_WAIT, server).await else {
        panic!("server task failed");
    };
    assert!(normal, "disconnect must close with the normal-closure code");
    assert_eq!(handle.phase(), ConnectionPhase::Disconnected);
}
