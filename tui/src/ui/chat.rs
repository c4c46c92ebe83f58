//! Conversation pane
//!
//! Messages of the active conversation; outgoing bubbles sit on the
//! right, incoming on the left with the sender handle.

use palaver_core::{bubble, SessionState};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem};
use ratatui::Frame;

use crate::app::App;

const BORDER_SIZE: u16 = 2;

pub fn render(frame: &mut Frame, app: &App, area: Rect, show_timestamps: bool) {
    let title = match app.session.state() {
        SessionState::Active { peer } => format!(" {peer} "),
        SessionState::Loading { peer, .. } => format!(" {peer} "),
        SessionState::Idle => " No conversation ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let items: Vec<ListItem> = match app.session.state() {
        SessionState::Idle => {
            // A failed load shows its error in place of the message list.
            let (text, style) = match app.session.banner_error() {
                Some(error) => (error.to_string(), Style::default().fg(Color::Red)),
                None => (
                    "Select a peer to start chatting".to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
            };
            vec![ListItem::new(Line::from(Span::styled(text, style)))]
        }
        SessionState::Loading { .. } => vec![ListItem::new(Line::from(Span::styled(
            "Loading history...",
            Style::default().fg(Color::DarkGray),
        )))],
        SessionState::Active { .. } => app
            .session
            .messages()
            .iter()
            .map(|message| {
                let b = bubble(message, app.session.identity());
                let time = if show_timestamps {
                    Some(Span::styled(b.time, Style::default().fg(Color::DarkGray)))
                } else {
                    None
                };

                let line = if b.outgoing {
                    let mut spans = Vec::new();
                    if let Some(time) = time {
                        spans.push(time);
                        spans.push(Span::raw(" "));
                    }
                    spans.push(Span::styled(
                        b.body,
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ));
                    Line::from(spans).right_aligned()
                } else {
                    let mut spans = vec![
                        Span::styled(
                            format!("<{}> ", message.from),
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(b.body),
                    ];
                    if let Some(time) = time {
                        spans.push(Span::raw(" "));
                        spans.push(time);
                    }
                    Line::from(spans)
                };
                ListItem::new(line)
            })
            .collect(),
    };

    // Keep the tail of the conversation in view.
    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible).block(block), area);
}
