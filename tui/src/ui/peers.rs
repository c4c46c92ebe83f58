//! Peers sidebar
//!
//! The conversation directory, with markers for the cursor and the
//! active conversation.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem};
use ratatui::Frame;

use crate::app::{App, Focus};

const CURSOR_PREFIX: &str = ">";
const IDLE_PREFIX: &str = " ";

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = if app.session.peers().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No peers",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.session
            .peers()
            .iter()
            .enumerate()
            .map(|(i, peer)| {
                let under_cursor = i == app.selected && app.focus == Focus::Peers;
                let active = app.session.active_peer() == Some(peer.as_str());

                let prefix = if under_cursor { CURSOR_PREFIX } else { IDLE_PREFIX };
                let style = if active {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if under_cursor {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default()
                };

                ListItem::new(Line::from(vec![
                    Span::raw(prefix),
                    Span::styled(peer.clone(), style),
                ]))
            })
            .collect()
    };

    let block = Block::default().borders(Borders::ALL).title(" Peers ");
    frame.render_widget(List::new(items).block(block), area);
}
