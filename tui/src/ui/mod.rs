//! UI rendering
//!
//! Pure functions from application state to ratatui widgets.

mod chat;
mod input;
mod peers;
mod status;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

use crate::app::App;
use crate::config::UiConfig;
use crate::input::InputState;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App, input: &InputState, ui_config: &UiConfig) {
    const MAIN_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = rows.as_ref() else {
        return;
    };

    render_main(frame, app, *main_area, ui_config);
    input::render(frame, app, input, *input_area);
    status::render(frame, app, *status_area);
}

/// Render the main area (peers sidebar + conversation).
fn render_main(frame: &mut Frame, app: &App, area: Rect, ui_config: &UiConfig) {
    const CHAT_MIN_WIDTH: u16 = 20;

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(ui_config.sidebar_width),
            Constraint::Min(CHAT_MIN_WIDTH),
        ])
        .split(area);

    let [peers_area, chat_area] = columns.as_ref() else {
        return;
    };

    peers::render(frame, app, *peers_area);
    chat::render(frame, app, *chat_area, ui_config.show_timestamps);
}
