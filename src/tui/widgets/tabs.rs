//! Tab bar for the Results / Job Info / Settings pane.

use crate::tui::window::Tab;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Tabs, Widget},
};

pub struct TabBar {
    selected: Tab,
}

impl TabBar {
    pub fn new(selected: Tab) -> Self {
        Self { selected }
    }
}

fn key_hint(tab: Tab) -> &'static str {
    match tab {
        Tab::Results => "F2",
        Tab::JobInfo => "F3",
        Tab::Settings => "F4",
    }
}

impl Widget for TabBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let titles: Vec<Line> = Tab::ALL
            .iter()
            .map(|&tab| Line::from(format!("{} {}", tab.title(), key_hint(tab))))
            .collect();
        let selected = Tab::ALL.iter().position(|t| *t == self.selected).unwrap_or(0);

        Tabs::new(titles)
            .select(selected)
            .style(Style::default().fg(Color::DarkGray))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .render(area, buf);
    }
}
