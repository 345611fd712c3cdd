//! Sessions sidebar.
//!
//! Expanded it lists session names; collapsed it shrinks to a narrow column
//! of initials.

use crate::project::Session;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Width of the sidebar when expanded and collapsed.
pub const EXPANDED_WIDTH: u16 = 28;
pub const COLLAPSED_WIDTH: u16 = 5;

pub struct Sidebar<'a> {
    sessions: &'a [Session],
    active_id: Option<&'a str>,
    cursor: usize,
    collapsed: bool,
    focused: bool,
}

impl<'a> Sidebar<'a> {
    pub fn new(
        sessions: &'a [Session],
        active_id: Option<&'a str>,
        cursor: usize,
        collapsed: bool,
        focused: bool,
    ) -> Self {
        Self {
            sessions,
            active_id,
            cursor,
            collapsed,
            focused,
        }
    }

    pub fn width(collapsed: bool) -> u16 {
        if collapsed {
            COLLAPSED_WIDTH
        } else {
            EXPANDED_WIDTH
        }
    }

    fn lines(&self) -> Vec<Line<'a>> {
        if self.sessions.is_empty() {
            let hint = if self.collapsed { "-" } else { "No sessions yet" };
            return vec![Line::from(Span::styled(
                hint,
                Style::default().fg(Color::DarkGray),
            ))];
        }

        let mut lines: Vec<Line> = self
            .sessions
            .iter()
            .enumerate()
            .map(|(i, session)| {
                let active = self.active_id == Some(session.id.as_str());
                let mut style = if active {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                if self.focused && i == self.cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }

                let text = if self.collapsed {
                    initial(&session.name)
                } else {
                    format!("{} {}", if active { "●" } else { " " }, session.name)
                };
                Line::from(Span::styled(text, style))
            })
            .collect();

        if !self.collapsed && self.focused {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter open  n new  d delete",
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines
    }
}

/// First letter of the session name, upper-cased.
fn initial(name: &str) -> String {
    name.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let title = if self.collapsed { "" } else { " Sessions " };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);

        Paragraph::new(self.lines()).block(block).render(area, buf);
    }
}
