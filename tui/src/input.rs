//! Input state and key handling
//!
//! Owns the composer buffer and cursor, and routes keys by focus: the
//! sidebar navigates and selects peers, the composer edits and sends.
//! The cursor counts characters, not bytes, so edits stay on char
//! boundaries.

use crossterm::event::KeyCode;

use crate::app::{App, Focus};

/// Key events the client reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Esc,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

impl KeyInput {
    /// Convert a crossterm key code, ignoring keys we do not handle.
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
    /// Cursor position in characters.
    cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map_or(self.buffer.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_index();
        self.buffer.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index();
            self.buffer.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index();
            self.buffer.remove(at);
        }
    }

    /// Take the composed text, resetting the buffer.
    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    /// Handle a key press for the current focus.
    pub fn handle_key(&mut self, key: KeyInput, app: &mut App) {
        match app.focus {
            Focus::Peers => match key {
                KeyInput::Up => app.move_selection(-1),
                KeyInput::Down => app.move_selection(1),
                KeyInput::Enter => app.select_highlighted(),
                KeyInput::Tab => app.focus = Focus::Composer,
                KeyInput::Esc => app.quit(),
                // Typing jumps straight into the composer.
                KeyInput::Char(c) => {
                    app.focus = Focus::Composer;
                    self.insert(c);
                }
                _ => {}
            },
            Focus::Composer => match key {
                KeyInput::Char(c) => self.insert(c),
                KeyInput::Backspace => self.backspace(),
                KeyInput::Delete => self.delete(),
                KeyInput::Left => self.cursor = self.cursor.saturating_sub(1),
                KeyInput::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
                KeyInput::Home => self.cursor = 0,
                KeyInput::End => self.cursor = self.char_len(),
                KeyInput::Enter => {
                    let text = self.take();
                    if !text.trim().is_empty() {
                        app.send(&text);
                    }
                }
                KeyInput::Tab => app.focus = Focus::Peers,
                KeyInput::Esc => app.quit(),
                KeyInput::Up | KeyInput::Down => {}
            },
        }
    }
}
