//! Large-query confirmation dialog.
//!
//! Shown when a dry run estimates more bytes than the project's warning
//! threshold. The query runs only after the user confirms.

use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::warehouse::format_bytes;

const DIALOG_HEIGHT: u16 = 10;

/// Renders the size warning over the current frame.
pub fn render_confirm_dialog(frame: &mut Frame, estimated_bytes: u64, threshold_bytes: u64) {
    let area = frame.area();
    let width = (area.width as f32 * 0.6).clamp(30.0, 70.0) as u16;
    let dialog_area = center_rect(width.min(area.width), DIALOG_HEIGHT.min(area.height), area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title("Large Query Warning")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let paragraph = Paragraph::new(dialog_lines(estimated_bytes, threshold_bytes))
        .block(block)
        .wrap(Wrap { trim: false })
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, dialog_area);
}

fn dialog_lines(estimated_bytes: u64, threshold_bytes: u64) -> Vec<Line<'static>> {
    let key = |k: &'static str, color: Color| {
        Span::styled(k, Style::default().fg(color).add_modifier(Modifier::BOLD))
    };

    vec![
        Line::from(vec![
            Span::styled("⚠ ", Style::default().fg(Color::Yellow)),
            Span::styled(
                "This query will process a lot of data.",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(format!("Estimated size:  {}", format_bytes(estimated_bytes))),
        Line::from(format!("Warning limit:   {}", format_bytes(threshold_bytes))),
        Line::from(""),
        Line::from(vec![
            key("[y]", Color::Green),
            Span::raw(" Run  "),
            key("[n]", Color::Red),
            Span::raw(" Cancel  "),
            key("[d]", Color::Cyan),
            Span::raw(" Run, don't ask again"),
        ]),
    ]
}

/// Centers a rectangle of the given size within the parent area.
pub fn center_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center);
    let vertical = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center);

    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
