//! Job Info tab: property/value view of the last job.

use crate::warehouse::JobInfo;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

const LABEL_WIDTH: usize = 24;

pub struct JobInfoView<'a> {
    job: Option<&'a JobInfo>,
}

impl<'a> JobInfoView<'a> {
    pub fn new(job: Option<&'a JobInfo>) -> Self {
        Self { job }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let Some(job) = self.job else {
            return vec![Line::from(Span::styled(
                "No job information to display",
                Style::default().fg(Color::DarkGray),
            ))];
        };

        job.display_rows()
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(
                        format!("{label:width$}", width = LABEL_WIDTH),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(value),
                ])
            })
            .collect()
    }
}

impl Widget for JobInfoView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines()).render(area, buf);
    }
}
