//! SQL editor pane.

use crate::tui::editor::{scroll_offset, Editor};
use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Editor pane widget.
pub struct EditorPane<'a> {
    editor: &'a Editor,
    focused: bool,
    running: bool,
}

impl<'a> EditorPane<'a> {
    pub fn new(editor: &'a Editor, focused: bool, running: bool) -> Self {
        Self {
            editor,
            focused,
            running,
        }
    }

    /// Screen position of the cursor inside `area`, if it is visible.
    pub fn cursor_position(&self, area: Rect) -> Option<Position> {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let (row, col) = self.editor.cursor();
        let top = scroll_offset(row, inner.height as usize);
        let x = inner.x as usize + col;
        let y = inner.y as usize + row - top;
        (x < inner.right() as usize && y < inner.bottom() as usize)
            .then(|| Position::new(x as u16, y as u16))
    }
}

impl Widget for EditorPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let title = if self.running {
            " SQL (running) "
        } else {
            " SQL "
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title)
            .title_bottom(Line::from(Span::styled(
                " F5 run ",
                Style::default().fg(Color::DarkGray),
            )));

        let inner_height = block.inner(area).height as usize;
        let top = scroll_offset(self.editor.cursor().0, inner_height);

        let lines: Vec<Line> = if self.editor.is_blank() && !self.focused {
            vec![Line::from(Span::styled(
                "Write a query, then press F5",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.editor
                .lines()
                .iter()
                .skip(top)
                .map(|l| Line::from(l.as_str()))
                .collect()
        };

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
