//! Connection manager - the persistent WebSocket to the message server
//!
//! Owns the transport and its lifecycle: the authentication handshake,
//! bounded reconnection with linear backoff, rejoin of the active
//! conversation after a reconnect, and dispatch of inbound events to a
//! single consumer channel. Transport failures never surface as errors
//! to callers; they show up as [`SocketEvent`]s and state transitions.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{ChatMessage, ConnectionState, OutboundFrame, RoomRef, SocketEvent};
use crate::ClientConfig;

/// Reconnection attempts before giving up for good.
const MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Base delay between attempts; grows linearly with the attempt number.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// Ceiling for the reconnect delay.
const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(5);
/// Handshake timeout for a single connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Cheap-to-clone sending side of the connection.
#[derive(Clone)]
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    state: Arc<Mutex<ConnectionState>>,
    rejoin: Arc<Mutex<Option<RoomRef>>>,
}

impl SocketHandle {
    /// Build a handle from its parts. [`SocketClient::connect`] wires this
    /// to the live transport; a bare channel works for driving a session
    /// without one.
    pub fn new(
        outbound: mpsc::UnboundedSender<OutboundFrame>,
        state: Arc<Mutex<ConnectionState>>,
    ) -> Self {
        Self {
            outbound,
            state,
            rejoin: Arc::new(Mutex::new(None)),
        }
    }

    /// Enqueue a frame for delivery.
    ///
    /// When not connected the frame is dropped and [`Error::SendDropped`]
    /// returned: sends are at-most-once, with no buffering or replay.
    /// `Join`/`Leave` frames update the remembered room either way, so a
    /// reconnect restores the subscription the session intended to hold.
    pub fn emit(&self, frame: OutboundFrame) -> Result<()> {
        match &frame {
            OutboundFrame::Join(room) => {
                *self.rejoin.lock() = Some(room.clone());
            }
            OutboundFrame::Leave(room) => {
                let mut rejoin = self.rejoin.lock();
                if rejoin.as_ref() == Some(room) {
                    *rejoin = None;
                }
            }
            OutboundFrame::Message(_) => {}
        }

        if *self.state.lock() != ConnectionState::Connected {
            warn!(event = frame.event(), "dropping frame: not connected");
            return Err(Error::SendDropped);
        }

        self.outbound
            .send(frame)
            .map_err(|_| Error::Connection("connection task stopped".into()))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }
}

/// Owns the supervisor task driving the transport.
pub struct SocketClient {
    handle: SocketHandle,
    shutdown: watch::Sender<bool>,
}

impl SocketClient {
    /// Establish the persistent connection authenticated as `identity`.
    ///
    /// Returns immediately. Connection failures are retried per the
    /// backoff policy and reported through `events`; after the retry
    /// budget is exhausted the state stays `Disconnected` until a new
    /// client is created.
    pub fn connect(
        config: &ClientConfig,
        identity: &str,
        events: mpsc::UnboundedSender<SocketEvent>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = SocketHandle::new(
            outbound_tx,
            Arc::new(Mutex::new(ConnectionState::Connecting)),
        );

        tokio::spawn(supervise(
            config.ws_url(),
            identity.to_string(),
            handle.clone(),
            outbound_rx,
            events,
            shutdown_rx,
        ));

        Self {
            handle,
            shutdown: shutdown_tx,
        }
    }

    /// Sending side, shared with the session controller.
    pub fn handle(&self) -> SocketHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Close the transport. Idempotent; safe to call from any state.
    pub fn disconnect(&self) {
        let _ = self.shutdown.send(true);
        *self.handle.state.lock() = ConnectionState::Disconnected;
    }
}

/// Connection loop: dial, run, back off, redial.
async fn supervise(
    ws_url: String,
    identity: String,
    handle: SocketHandle,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;
    let mut was_connected = false;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&ws_url)).await {
            Ok(Ok((stream, _))) => {
                attempt = 0;
                was_connected = true;
                info!(url = %ws_url, "connected to message server");

                let ended = run_connection(
                    stream,
                    &identity,
                    &handle,
                    &mut outbound,
                    &events,
                    &mut shutdown,
                )
                .await;

                match ended {
                    // Shutdown requested or every sender dropped.
                    Ok(()) => break,
                    Err(e) => {
                        debug!(error = %e, "connection lost");
                        *handle.state.lock() = ConnectionState::Reconnecting;
                        let _ = events.send(SocketEvent::Disconnected);
                    }
                }
            }
            Ok(Err(e)) => {
                attempt += 1;
                warn!(attempt, error = %e, "connect failed");
                let _ = events.send(SocketEvent::ConnectionError(e.to_string()));
            }
            Err(_) => {
                attempt += 1;
                warn!(attempt, "connect timed out");
                let _ = events.send(SocketEvent::ConnectionError(
                    "connection timed out".to_string(),
                ));
            }
        }

        if attempt >= MAX_RECONNECT_ATTEMPTS {
            warn!("reconnection attempts exhausted");
            let _ = events.send(SocketEvent::ConnectionError(
                "reconnection attempts exhausted".to_string(),
            ));
            break;
        }

        *handle.state.lock() = if was_connected {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };

        let delay = (RECONNECT_DELAY * attempt.max(1)).min(RECONNECT_DELAY_MAX);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    *handle.state.lock() = ConnectionState::Disconnected;
}

/// Pump one established connection until it ends.
///
/// `Ok(())` means an orderly stop was requested; any transport failure
/// comes back as `Err` so the supervisor reconnects.
async fn run_connection(
    stream: WsStream,
    identity: &str,
    handle: &SocketHandle,
    outbound: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    events: &mpsc::UnboundedSender<SocketEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    let (mut write, mut read) = stream.split();

    // Authentication handshake: identify this connection before anything
    // else flows.
    let auth = json!({
        "type": "auth",
        "payload": { "username": identity }
    });
    write.send(WsMessage::Text(auth.to_string())).await?;

    *handle.state.lock() = ConnectionState::Connected;

    // The server holds room membership only for the lifetime of a
    // connection; restore the active conversation's subscription.
    let rejoin = handle.rejoin.lock().clone();
    if let Some(room) = rejoin {
        let frame = OutboundFrame::Join(room);
        write.send(WsMessage::Text(frame.to_envelope()?)).await?;
        debug!("rejoined active conversation");
    }

    let _ = events.send(SocketEvent::Connected);

    loop {
        tokio::select! {
            maybe_frame = outbound.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        write.send(WsMessage::Text(frame.to_envelope()?)).await?;
                    }
                    None => return Ok(()),
                }
            }
            maybe_msg = read.next() => {
                match maybe_msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(event) = parse_inbound(&text) {
                            let _ = events.send(event);
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        return Err(Error::WebSocket("connection closed".to_string()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            _ = shutdown.changed() => {
                let _ = write.send(WsMessage::Close(None)).await;
                return Ok(());
            }
        }
    }
}

/// Decode an inbound `{"type", "payload"}` envelope.
///
/// Every event on the connection reaches this client regardless of
/// conversation; scoping to the active pair happens in the session
/// controller.
fn parse_inbound(text: &str) -> Option<SocketEvent> {
    let data: serde_json::Value = serde_json::from_str(text).ok()?;
    match data["type"].as_str() {
        Some("chatMessage") => {
            let payload = data.get("payload")?;
            serde_json::from_value::<ChatMessage>(payload.clone())
                .ok()
                .map(SocketEvent::Message)
        }
        other => {
            debug!(event = ?other, "ignoring unhandled event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with_state(state: ConnectionState) -> (SocketHandle, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SocketHandle::new(tx, Arc::new(Mutex::new(state))), rx)
    }

    fn room(a: &str, b: &str) -> RoomRef {
        RoomRef {
            username: a.to_string(),
            other_user: b.to_string(),
        }
    }

    #[test]
    fn emit_while_disconnected_drops_the_frame() {
        let (handle, mut rx) = handle_with_state(ConnectionState::Disconnected);
        let err = handle
            .emit(OutboundFrame::Message(ChatMessage {
                from: "alice".to_string(),
                to: "bob".to_string(),
                msg: "hi".to_string(),
                timestamp: chrono::Utc::now(),
                id: None,
            }))
            .unwrap_err();
        assert!(matches!(err, Error::SendDropped));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn join_is_remembered_for_rejoin_even_when_dropped() {
        let (handle, _rx) = handle_with_state(ConnectionState::Reconnecting);
        let _ = handle.emit(OutboundFrame::Join(room("alice", "bob")));
        assert_eq!(*handle.rejoin.lock(), Some(room("alice", "bob")));
    }

    #[test]
    fn leave_clears_the_remembered_room() {
        let (handle, _rx) = handle_with_state(ConnectionState::Connected);
        handle.emit(OutboundFrame::Join(room("alice", "bob"))).unwrap();
        handle.emit(OutboundFrame::Leave(room("alice", "bob"))).unwrap();
        assert_eq!(*handle.rejoin.lock(), None);
    }

    #[test]
    fn leave_for_another_room_keeps_the_subscription() {
        let (handle, _rx) = handle_with_state(ConnectionState::Connected);
        handle.emit(OutboundFrame::Join(room("alice", "bob"))).unwrap();
        handle.emit(OutboundFrame::Leave(room("alice", "carol"))).unwrap();
        assert_eq!(*handle.rejoin.lock(), Some(room("alice", "bob")));
    }

    #[test]
    fn inbound_chat_message_parses() {
        let text = r#"{"type":"chatMessage","payload":{"from":"bob","to":"alice","msg":"hi","timestamp":"2024-05-01T12:00:00Z"}}"#;
        match parse_inbound(text) {
            Some(SocketEvent::Message(m)) => {
                assert_eq!(m.from, "bob");
                assert_eq!(m.msg, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert!(parse_inbound(r#"{"type":"presence","payload":{}}"#).is_none());
        assert!(parse_inbound("not json").is_none());
    }
}
