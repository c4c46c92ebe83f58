//! Per-conversation message log
//!
//! Holds the messages of the active conversation only. Order is insertion
//! order: history as delivered, then live appends. The store never
//! re-sorts and never deduplicates; echo suppression is the session
//! controller's responsibility.

use crate::models::ChatMessage;

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a freshly fetched history.
    pub fn load(&mut self, history: Vec<ChatMessage>) {
        self.messages = history;
    }

    /// Append a message at the end of the log.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop all messages. Called on every conversation switch.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Read-only view of the full ordered log.
    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
