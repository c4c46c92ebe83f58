//! Conversation session controller
//!
//! The state machine deciding which conversation is active. It owns the
//! message store and the peer directory, and mediates every join/leave
//! against the transport. All mutation happens on one consumer loop;
//! async completions re-enter through [`SessionEvent`]s carrying the
//! selection sequence they were issued under, so results that arrive
//! after the selection moved on are discarded.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::directory::PeerDirectory;
use crate::error::{Error, Result};
use crate::models::{ChatMessage, ConnectionState, OutboundFrame, RoomRef, SocketEvent};
use crate::socket::SocketHandle;
use crate::store::MessageStore;

/// Which conversation, if any, the session is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading { peer: String, seq: u64 },
    Active { peer: String },
}

/// A pending history fetch issued by [`ChatSession::select_peer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub peer: String,
    pub seq: u64,
}

/// Events consumed by the session loop.
#[derive(Debug)]
pub enum SessionEvent {
    Socket(SocketEvent),
    HistoryLoaded {
        peer: String,
        seq: u64,
        result: Result<Vec<ChatMessage>>,
    },
    PeersLoaded(Result<Vec<String>>),
}

pub struct ChatSession {
    identity: String,
    api: Arc<ApiClient>,
    socket: SocketHandle,
    store: MessageStore,
    directory: PeerDirectory,
    state: SessionState,
    load_seq: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
    banner_error: Option<String>,
}

impl ChatSession {
    pub fn new(
        identity: impl Into<String>,
        api: Arc<ApiClient>,
        socket: SocketHandle,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            identity: identity.into(),
            api,
            socket,
            store: MessageStore::new(),
            directory: PeerDirectory::new(),
            state: SessionState::Idle,
            load_seq: 0,
            events,
            banner_error: None,
        }
    }

    // ============= Accessors =============

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.all()
    }

    pub fn peers(&self) -> &[String] {
        self.directory.peers()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_peer(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { peer } => Some(peer),
            _ => None,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.socket.state()
    }

    pub fn banner_error(&self) -> Option<&str> {
        self.banner_error.as_deref()
    }

    // ============= Conversation switching =============

    /// Begin switching to `peer`.
    ///
    /// Leaves the previously active conversation, clears the store, and
    /// enters `Loading`. Returns the request to hand to
    /// [`fetch_history`](Self::fetch_history), or `None` when `peer` is
    /// already the active conversation.
    pub fn select_peer(&mut self, peer: &str) -> Option<HistoryRequest> {
        if matches!(&self.state, SessionState::Active { peer: p } if p == peer) {
            return None;
        }

        if let SessionState::Active { peer: old } = &self.state {
            let room = self.room_with(old);
            if let Err(e) = self.socket.emit(OutboundFrame::Leave(room)) {
                debug!(error = %e, "leave not delivered");
            }
        }

        self.store.clear();
        self.banner_error = None;
        self.load_seq += 1;
        let seq = self.load_seq;
        self.state = SessionState::Loading {
            peer: peer.to_string(),
            seq,
        };

        Some(HistoryRequest {
            peer: peer.to_string(),
            seq,
        })
    }

    /// Issue the history fetch for a pending selection. The outcome
    /// re-enters the session loop as [`SessionEvent::HistoryLoaded`].
    pub fn fetch_history(&self, req: HistoryRequest) {
        let api = self.api.clone();
        let identity = self.identity.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.message_history(&identity, &req.peer).await;
            let _ = events.send(SessionEvent::HistoryLoaded {
                peer: req.peer,
                seq: req.seq,
                result,
            });
        });
    }

    /// Refresh the peer directory. Called when the chat view is
    /// (re)initialized; outcome re-enters as [`SessionEvent::PeersLoaded`].
    pub fn fetch_directory(&self) {
        let api = self.api.clone();
        let identity = self.identity.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.list_peers(&identity).await;
            let _ = events.send(SessionEvent::PeersLoaded(result));
        });
    }

    /// Leave the active conversation and return to `Idle`. No-op when no
    /// conversation is active.
    pub fn leave_active(&mut self) {
        if let SessionState::Active { peer } = &self.state {
            let room = self.room_with(peer);
            if let Err(e) = self.socket.emit(OutboundFrame::Leave(room)) {
                debug!(error = %e, "leave not delivered");
            }
        }
        self.state = SessionState::Idle;
        self.store.clear();
    }

    // ============= Event handling =============

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HistoryLoaded { peer, seq, result } => {
                self.on_history_loaded(peer, seq, result);
            }
            SessionEvent::PeersLoaded(result) => match result {
                Ok(peers) => self.directory.replace(peers),
                Err(e) => {
                    warn!(error = %e, "peer directory load failed");
                    self.banner_error = Some(e.to_string());
                }
            },
            SessionEvent::Socket(event) => self.on_socket_event(event),
        }
    }

    fn on_history_loaded(&mut self, peer: String, seq: u64, result: Result<Vec<ChatMessage>>) {
        // Stale-response guard: a selection made after this fetch was
        // issued supersedes it.
        let current = matches!(
            &self.state,
            SessionState::Loading { peer: p, seq: s } if *p == peer && *s == seq
        );
        if !current {
            debug!(%peer, seq, "discarding stale history response");
            return;
        }

        match result {
            Ok(history) => {
                self.store.load(history);
                let room = self.room_with(&peer);
                if let Err(e) = self.socket.emit(OutboundFrame::Join(room)) {
                    warn!(error = %e, "join not delivered");
                }
                self.state = SessionState::Active { peer };
            }
            Err(e) => {
                warn!(%peer, error = %e, "history load failed");
                self.banner_error = Some(e.to_string());
                self.state = SessionState::Idle;
            }
        }
    }

    fn on_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Message(message) => {
                let SessionState::Active { peer } = &self.state else {
                    return;
                };
                // Every conversation's events reach this client. Keep only
                // the active pair, and drop the server's echo of our own
                // sends: the local copy was appended at send time.
                if message.involves(&self.identity, peer) && message.from != self.identity {
                    self.store.append(message);
                }
            }
            SocketEvent::Connected => {
                // Rejoin is the connection manager's duty.
                self.banner_error = None;
            }
            SocketEvent::Disconnected => {
                debug!("transport disconnected");
            }
            SocketEvent::ConnectionError(reason) => {
                self.banner_error = Some(reason);
            }
        }
    }

    // ============= Sending =============

    /// Send `text` to the active peer.
    ///
    /// The message is appended locally before the network send, so the
    /// sender sees it immediately. A send that cannot be delivered keeps
    /// the local copy and is reported, not retried. Whitespace-only input
    /// and sends outside an active conversation are no-ops.
    pub fn send_message(&mut self, text: &str) -> Result<()> {
        let body = text.trim();
        if body.is_empty() {
            return Ok(());
        }
        let SessionState::Active { peer } = &self.state else {
            return Ok(());
        };

        let message = ChatMessage {
            from: self.identity.clone(),
            to: peer.clone(),
            msg: body.to_string(),
            timestamp: Utc::now(),
            id: None,
        };

        self.store.append(message.clone());

        match self.socket.emit(OutboundFrame::Message(message)) {
            Ok(()) => Ok(()),
            Err(Error::SendDropped) => {
                warn!("message not delivered: not connected");
                self.banner_error = Some("message not delivered: not connected".to_string());
                Err(Error::SendDropped)
            }
            Err(e) => Err(e),
        }
    }

    fn room_with(&self, peer: &str) -> RoomRef {
        RoomRef {
            username: self.identity.clone(),
            other_user: peer.to_string(),
        }
    }
}
