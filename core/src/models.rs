//! Data models for the chat client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

/// A single direct message between two users.
///
/// Wire shape matches the message server: `from`, `to`, `msg`, an
/// ISO-8601 `timestamp`, and an optional server-assigned `id`. Messages
/// are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub to: String,
    pub msg: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatMessage {
    /// Whether this message belongs to the conversation between `a` and
    /// `b` (the unordered sender/recipient pair).
    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

// ============================================================================
// Connection state
// ============================================================================

/// Lifecycle of the persistent transport, owned by the connection
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

// ============================================================================
// Wire frames
// ============================================================================

/// Subscription payload for `join`/`leave` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    pub username: String,
    #[serde(rename = "otherUser")]
    pub other_user: String,
}

/// Frames the client sends to the message server.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Join(RoomRef),
    Leave(RoomRef),
    Message(ChatMessage),
}

impl OutboundFrame {
    /// Event name on the wire.
    pub fn event(&self) -> &'static str {
        match self {
            OutboundFrame::Join(_) => "join",
            OutboundFrame::Leave(_) => "leave",
            OutboundFrame::Message(_) => "chatMessage",
        }
    }

    /// Serialize as the `{"type": ..., "payload": ...}` envelope.
    pub fn to_envelope(&self) -> serde_json::Result<String> {
        let payload = match self {
            OutboundFrame::Join(room) | OutboundFrame::Leave(room) => serde_json::to_value(room)?,
            OutboundFrame::Message(message) => serde_json::to_value(message)?,
        };
        serde_json::to_string(&serde_json::json!({
            "type": self.event(),
            "payload": payload,
        }))
    }
}

/// Events the connection manager delivers to its consumer.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    Connected,
    Disconnected,
    Message(ChatMessage),
    ConnectionError(String),
}
