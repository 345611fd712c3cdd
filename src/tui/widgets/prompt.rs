//! Path prompt used for the save and open dialogs.

use ratatui::{
    layout::{Alignment, Position},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::confirm::center_rect;
use crate::tui::app::PromptKind;

const PROMPT_HEIGHT: u16 = 6;

/// Renders the prompt and places the cursor at the end of the input.
pub fn render_path_prompt(frame: &mut Frame, kind: PromptKind, input: &str) {
    let area = frame.area();
    let width = (area.width as f32 * 0.7).clamp(30.0, 90.0) as u16;
    let dialog_area = center_rect(width.min(area.width), PROMPT_HEIGHT.min(area.height), area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(kind.title())
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(dialog_area);

    let visible = inner.width.saturating_sub(3) as usize;
    let shown = tail(input, visible);

    let lines = vec![
        Line::from(Span::styled(
            "Project file path (.giant):",
            Style::default().fg(Color::Gray),
        )),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::raw(shown.to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Enter confirm  Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), dialog_area);

    let x = inner.x + 2 + shown.chars().count() as u16;
    frame.set_cursor_position(Position::new(x.min(inner.right()), inner.y + 1));
}

/// The last `max_chars` characters of `s`.
fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let skip = count - max_chars;
    s.char_indices().nth(skip).map_or("", |(i, _)| &s[i..])
}
