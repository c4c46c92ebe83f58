//! Session controller state machine tests
//!
//! The controller is driven against a bare outbound channel: emitted
//! frames land in a receiver, and fetch/socket completions are injected
//! as events, so selection races can be replayed deterministically.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use palaver_core::{
    ApiClient, ChatMessage, ChatSession, ClientConfig, ConnectionState, Error, OutboundFrame,
    SessionEvent, SessionState, SocketEvent, SocketHandle,
};

struct Harness {
    session: ChatSession,
    frames: mpsc::UnboundedReceiver<OutboundFrame>,
    connection: Arc<Mutex<ConnectionState>>,
}

fn harness(identity: &str) -> Harness {
    let config = ClientConfig::new("127.0.0.1", 9, false);
    let api = Arc::new(ApiClient::new(&config).unwrap());
    let (frame_tx, frames) = mpsc::unbounded_channel();
    let connection = Arc::new(Mutex::new(ConnectionState::Connected));
    let socket = SocketHandle::new(frame_tx, connection.clone());
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    Harness {
        session: ChatSession::new(identity, api, socket, event_tx),
        frames,
        connection,
    }
}

fn msg(from: &str, to: &str, body: &str, at: i64) -> ChatMessage {
    ChatMessage {
        from: from.to_string(),
        to: to.to_string(),
        msg: body.to_string(),
        timestamp: Utc.timestamp_opt(at, 0).unwrap(),
        id: None,
    }
}

/// Select `peer` and resolve its history fetch successfully.
fn activate(h: &mut Harness, peer: &str, history: Vec<ChatMessage>) {
    let req = h.session.select_peer(peer).expect("selection should start loading");
    h.session.handle_event(SessionEvent::HistoryLoaded {
        peer: req.peer,
        seq: req.seq,
        result: Ok(history),
    });
    assert_eq!(h.session.active_peer(), Some(peer));
}

fn drain(h: &mut Harness) -> Vec<OutboundFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = h.frames.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn history_of_superseded_selection_is_discarded() {
    let mut h = harness("alice");

    let bob = h.session.select_peer("bob").unwrap();
    let carol = h.session.select_peer("carol").unwrap();

    // Bob's fetch resolves after the user already moved on.
    h.session.handle_event(SessionEvent::HistoryLoaded {
        peer: bob.peer,
        seq: bob.seq,
        result: Ok(vec![msg("bob", "alice", "old news", 1)]),
    });
    assert!(h.session.messages().is_empty());
    assert!(matches!(
        h.session.state(),
        SessionState::Loading { peer, .. } if peer == "carol"
    ));

    h.session.handle_event(SessionEvent::HistoryLoaded {
        peer: carol.peer,
        seq: carol.seq,
        result: Ok(vec![msg("carol", "alice", "hi", 2)]),
    });
    assert_eq!(h.session.active_peer(), Some("carol"));
    assert_eq!(h.session.messages().len(), 1);
    assert_eq!(h.session.messages()[0].from, "carol");

    // Only carol was ever joined.
    let joins: Vec<_> = drain(&mut h)
        .into_iter()
        .filter_map(|f| match f {
            OutboundFrame::Join(room) => Some(room.other_user),
            _ => None,
        })
        .collect();
    assert_eq!(joins, ["carol"]);
}

#[tokio::test]
async fn reselecting_the_active_peer_is_a_noop() {
    let mut h = harness("alice");
    activate(&mut h, "bob", vec![msg("bob", "alice", "hi", 1)]);
    drain(&mut h);

    assert!(h.session.select_peer("bob").is_none());
    assert_eq!(h.session.messages().len(), 1);
    assert!(drain(&mut h).is_empty());
}

#[tokio::test]
async fn local_send_appears_once_despite_server_echo() {
    let mut h = harness("alice");
    activate(&mut h, "bob", Vec::new());

    h.session.send_message("hello").unwrap();
    assert_eq!(h.session.messages().len(), 1);

    // The server echoes the sender's own message back.
    h.session
        .handle_event(SessionEvent::Socket(SocketEvent::Message(msg(
            "alice", "bob", "hello", 2,
        ))));
    assert_eq!(h.session.messages().len(), 1);

    let sends = drain(&mut h)
        .into_iter()
        .filter(|f| matches!(f, OutboundFrame::Message(_)))
        .count();
    assert_eq!(sends, 1);
}

#[tokio::test]
async fn foreign_conversation_events_are_ignored() {
    let mut h = harness("alice");
    activate(&mut h, "bob", vec![msg("bob", "alice", "hi", 1)]);

    // carol -> alice: a different conversation of ours.
    h.session
        .handle_event(SessionEvent::Socket(SocketEvent::Message(msg(
            "carol", "alice", "x", 2,
        ))));
    // carol -> bob: not our conversation at all.
    h.session
        .handle_event(SessionEvent::Socket(SocketEvent::Message(msg(
            "carol", "bob", "y", 3,
        ))));

    assert_eq!(h.session.messages().len(), 1);
    assert_eq!(h.session.messages()[0].msg, "hi");
}

#[tokio::test]
async fn history_then_send_keeps_order_and_emits_once() {
    let mut h = harness("alice");
    activate(&mut h, "bob", vec![msg("bob", "alice", "hi", 1)]);

    h.session.send_message("hello").unwrap();

    let bodies: Vec<_> = h.session.messages().iter().map(|m| m.msg.as_str()).collect();
    assert_eq!(bodies, ["hi", "hello"]);

    let sends: Vec<_> = drain(&mut h)
        .into_iter()
        .filter_map(|f| match f {
            OutboundFrame::Message(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].from, "alice");
    assert_eq!(sends[0].to, "bob");
    assert_eq!(sends[0].msg, "hello");
}

#[tokio::test]
async fn history_failure_returns_to_idle_without_joining() {
    let mut h = harness("alice");
    let req = h.session.select_peer("bob").unwrap();

    h.session.handle_event(SessionEvent::HistoryLoaded {
        peer: req.peer,
        seq: req.seq,
        result: Err(Error::HistoryLoad("HTTP 500".to_string())),
    });

    assert_eq!(*h.session.state(), SessionState::Idle);
    assert!(h.session.banner_error().is_some());
    assert!(!drain(&mut h)
        .iter()
        .any(|f| matches!(f, OutboundFrame::Join(_))));
}

#[tokio::test]
async fn leave_when_idle_is_a_noop() {
    let mut h = harness("alice");
    h.session.leave_active();
    assert_eq!(*h.session.state(), SessionState::Idle);
    assert!(drain(&mut h).is_empty());
}

#[tokio::test]
async fn leaving_the_active_conversation_unsubscribes() {
    let mut h = harness("alice");
    activate(&mut h, "bob", vec![msg("bob", "alice", "hi", 1)]);
    drain(&mut h);

    h.session.leave_active();

    assert_eq!(*h.session.state(), SessionState::Idle);
    assert!(h.session.messages().is_empty());
    let leaves: Vec<_> = drain(&mut h)
        .into_iter()
        .filter_map(|f| match f {
            OutboundFrame::Leave(room) => Some(room.other_user),
            _ => None,
        })
        .collect();
    assert_eq!(leaves, ["bob"]);
}

#[tokio::test]
async fn switching_peers_leaves_the_old_conversation_first() {
    let mut h = harness("alice");
    activate(&mut h, "bob", vec![msg("bob", "alice", "hi", 1)]);
    drain(&mut h);

    let req = h.session.select_peer("carol").unwrap();

    assert!(h.session.messages().is_empty());
    assert!(matches!(
        h.session.state(),
        SessionState::Loading { peer, .. } if peer == "carol"
    ));
    let frames = drain(&mut h);
    assert_eq!(frames.len(), 1);
    assert!(matches!(
        &frames[0],
        OutboundFrame::Leave(room) if room.other_user == "bob"
    ));

    // The switch completes normally afterwards.
    h.session.handle_event(SessionEvent::HistoryLoaded {
        peer: req.peer,
        seq: req.seq,
        result: Ok(Vec::new()),
    });
    assert_eq!(h.session.active_peer(), Some("carol"));
}

#[tokio::test]
async fn send_while_disconnected_keeps_the_local_echo() {
    let mut h = harness("alice");
    activate(&mut h, "bob", Vec::new());
    drain(&mut h);

    *h.connection.lock() = ConnectionState::Disconnected;

    let err = h.session.send_message("hello").unwrap_err();
    assert!(matches!(err, Error::SendDropped));

    // Shown locally, never delivered, never retried.
    assert_eq!(h.session.messages().len(), 1);
    assert!(h.session.banner_error().is_some());
    assert!(drain(&mut h).is_empty());
}

#[tokio::test]
async fn whitespace_only_input_is_not_sent() {
    let mut h = harness("alice");
    activate(&mut h, "bob", Vec::new());
    drain(&mut h);

    h.session.send_message("   ").unwrap();
    assert!(h.session.messages().is_empty());
    assert!(drain(&mut h).is_empty());
}

#[tokio::test]
async fn send_without_an_active_conversation_is_ignored() {
    let mut h = harness("alice");
    h.session.send_message("hello").unwrap();
    assert!(h.session.messages().is_empty());
    assert!(drain(&mut h).is_empty());
}

#[tokio::test]
async fn inbound_messages_while_loading_are_dropped() {
    let mut h = harness("alice");
    let _req = h.session.select_peer("bob").unwrap();

    h.session
        .handle_event(SessionEvent::Socket(SocketEvent::Message(msg(
            "bob", "alice", "early", 1,
        ))));
    assert!(h.session.messages().is_empty());
}

#[tokio::test]
async fn directory_load_populates_the_peer_list() {
    let mut h = harness("alice");
    h.session.handle_event(SessionEvent::PeersLoaded(Ok(vec![
        "bob".to_string(),
        "carol".to_string(),
    ])));
    let peers: Vec<&str> = h.session.peers().iter().map(String::as_str).collect();
    assert_eq!(peers, ["bob", "carol"]);

    h.session.handle_event(SessionEvent::PeersLoaded(Err(
        Error::DirectoryLoad("HTTP 502".to_string()),
    )));
    assert!(h.session.banner_error().is_some());
}

#[tokio::test]
async fn reconnecting_clears_the_banner() {
    let mut h = harness("alice");
    h.session
        .handle_event(SessionEvent::Socket(SocketEvent::ConnectionError(
            "boom".to_string(),
        )));
    assert!(h.session.banner_error().is_some());

    h.session
        .handle_event(SessionEvent::Socket(SocketEvent::Connected));
    assert!(h.session.banner_error().is_none());
}
