//! Status bar
//!
//! Connection state, identity, active conversation, and the error
//! banner.

use palaver_core::ConnectionState;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let connection = match app.session.connection_state() {
        ConnectionState::Disconnected => Span::styled(
            "Disconnected",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        ConnectionState::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        }
        ConnectionState::Reconnecting => {
            Span::styled("Reconnecting...", Style::default().fg(Color::Yellow))
        }
        ConnectionState::Connected => {
            Span::styled("Connected", Style::default().fg(Color::Green))
        }
    };

    let identity = Span::styled(
        format!(" | {}", app.session.identity()),
        Style::default().fg(Color::Gray),
    );

    let conversation = app.session.active_peer().map_or_else(String::new, |peer| {
        format!(" | Chat: {} | Messages: {}", peer, app.session.messages().len())
    });

    let mut spans = vec![
        Span::raw(" "),
        connection,
        identity,
        Span::styled(conversation, Style::default().fg(Color::Gray)),
    ];

    if let Some(error) = app.session.banner_error() {
        spans.push(Span::styled(
            format!(" | {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" | {status}"),
            Style::default().fg(Color::Magenta),
        ));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(paragraph, area);
}
