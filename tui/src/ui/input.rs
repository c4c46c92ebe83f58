//! Input line
//!
//! The composer buffer with its cursor; dimmed while the sidebar has
//! focus.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{App, Focus};
use crate::input::InputState;

const PROMPT_WIDTH: u16 = 3; // "> " inside the left border
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside the top border
const RIGHT_PADDING: u16 = 1; // inside the right border

pub fn render(frame: &mut Frame, app: &App, input: &InputState, area: Rect) {
    let block = Block::default().borders(Borders::ALL);

    let style = if app.focus == Focus::Composer {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text = format!("> {}", input.buffer());
    frame.render_widget(Paragraph::new(text).style(style).block(block), area);

    if app.focus == Focus::Composer {
        let available = area.width.saturating_sub(PROMPT_WIDTH + RIGHT_PADDING);
        let offset = (input.cursor() as u16).min(available);

        let max_x = area
            .x
            .saturating_add(area.width)
            .saturating_sub(RIGHT_PADDING);
        let x = area
            .x
            .saturating_add(PROMPT_WIDTH)
            .saturating_add(offset)
            .min(max_x);
        let y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);
        frame.set_cursor_position((x, y));
    }
}
