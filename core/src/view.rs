//! Presentation helpers - formatting messages for display

use chrono::{DateTime, Local, Utc};

use crate::models::ChatMessage;

/// A message prepared for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub body: String,
    pub time: String,
    /// Sent by the local user; rendered on the opposite side.
    pub outgoing: bool,
}

/// Format a message relative to `current_user`.
pub fn bubble(message: &ChatMessage, current_user: &str) -> Bubble {
    Bubble {
        body: message.msg.clone(),
        time: format_time(&message.timestamp),
        outgoing: message.from == current_user,
    }
}

/// Localized time-of-day stamp.
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}
