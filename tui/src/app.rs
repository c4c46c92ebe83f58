//! UI application state

use palaver_core::ChatSession;

/// Which pane owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Peers,
    Composer,
}

pub struct App {
    pub session: ChatSession,
    pub focus: Focus,
    /// Sidebar cursor position.
    pub selected: usize,
    /// Transient status text, shown in the status bar.
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            focus: Focus::Peers,
            selected: 0,
            status: None,
            should_quit: false,
        }
    }

    /// Peer under the sidebar cursor.
    pub fn highlighted_peer(&self) -> Option<&str> {
        self.session.peers().get(self.selected).map(String::as_str)
    }

    /// Move the sidebar cursor, wrapping around.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.session.peers().len();
        if len == 0 {
            return;
        }
        let next = (self.selected as isize + delta).rem_euclid(len as isize);
        self.selected = next as usize;
    }

    /// Switch the conversation to the peer under the cursor.
    pub fn select_highlighted(&mut self) {
        let Some(peer) = self.highlighted_peer().map(str::to_string) else {
            return;
        };
        if let Some(req) = self.session.select_peer(&peer) {
            self.session.fetch_history(req);
        }
        self.focus = Focus::Composer;
        self.status = None;
    }

    /// Send composed text to the active peer.
    pub fn send(&mut self, text: &str) {
        if let Err(e) = self.session.send_message(text) {
            self.status = Some(e.to_string());
        }
    }

    pub fn quit(&mut self) {
        self.session.leave_active();
        self.should_quit = true;
    }
}
