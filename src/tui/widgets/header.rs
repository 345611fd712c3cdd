//! Header bar: application name plus the window switcher.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::Widget,
};

/// One entry in the window switcher.
pub struct WindowTitle<'a> {
    pub title: &'a str,
    pub focused: bool,
    pub running: bool,
}

/// Header bar widget.
pub struct Header<'a> {
    windows: Vec<WindowTitle<'a>>,
}

impl<'a> Header<'a> {
    pub fn new(windows: Vec<WindowTitle<'a>>) -> Self {
        Self { windows }
    }
}

/// Label of one switcher entry, e.g. `2:sales.giant*`.
fn entry_label(index: usize, window: &WindowTitle<'_>) -> String {
    format!(
        " {}:{}{} ",
        index + 1,
        window.title,
        if window.running { "*" } else { "" }
    )
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        for x in area.left()..area.right() {
            buf[(x, area.y)].set_style(style);
        }

        let name = format!(" Giant v{} ", env!("CARGO_PKG_VERSION"));
        buf.set_span(area.x, area.y, &Span::styled(name.as_str(), style), area.width);

        let mut x = area.x + name.len() as u16 + 1;
        for (i, window) in self.windows.iter().enumerate() {
            if x >= area.right() {
                break;
            }
            let entry_style = if window.focused {
                Style::default().bg(Color::Cyan).fg(Color::Black)
            } else {
                Style::default().bg(Color::Blue).fg(Color::Gray)
            };
            let label = entry_label(i, window);
            let span = Span::styled(label.as_str(), entry_style);
            let (next_x, _) = buf.set_span(x, area.y, &span, area.right() - x);
            x = next_x + 1;
        }
    }
}
