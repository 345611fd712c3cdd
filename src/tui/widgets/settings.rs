//! Settings tab view.

use crate::project::ProjectDocument;
use crate::tui::settings::{SettingsField, SettingsForm};
use crate::warehouse::format_bytes;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

const LABEL_WIDTH: usize = 34;

pub struct SettingsView<'a> {
    form: &'a SettingsForm,
    document: &'a ProjectDocument,
    dataset_count: usize,
    focused: bool,
}

impl<'a> SettingsView<'a> {
    pub fn new(
        form: &'a SettingsForm,
        document: &'a ProjectDocument,
        dataset_count: usize,
        focused: bool,
    ) -> Self {
        Self {
            form,
            document,
            dataset_count,
            focused,
        }
    }

    fn value(&self, field: SettingsField) -> String {
        let doc = self.document;
        match field {
            SettingsField::ProjectId => format!("{}_", self.form.project_input),
            SettingsField::WarnSize => {
                let shown = self
                    .form
                    .warn_input
                    .parse::<u64>()
                    .map(format_bytes)
                    .unwrap_or_else(|_| "invalid".to_string());
                format!("{}_  ({shown})", self.form.warn_input)
            }
            SettingsField::ShowWarning => {
                (if doc.show_query_size_warning { "[x]" } else { "[ ]" }).to_string()
            }
            SettingsField::DefaultDataset => {
                let current = doc
                    .default_dataset
                    .as_ref()
                    .map(|d| d.dataset_id.as_str())
                    .unwrap_or("-- none --");
                format!("< {current} >  ({} available)", self.dataset_count)
            }
            SettingsField::Location => {
                let current = doc.query_location.as_deref().unwrap_or("-- none --");
                format!("< {current} >")
            }
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line> = SettingsField::ALL
            .iter()
            .map(|&field| {
                let selected = self.focused && field == self.form.selected;
                let marker = if selected { "> " } else { "  " };
                let label_style = if selected {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Cyan)),
                    Span::styled(
                        format!("{:width$}", field.label(), width = LABEL_WIDTH),
                        label_style,
                    ),
                    Span::raw(self.value(field)),
                ])
            })
            .collect();

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "↑/↓ select  Enter apply  ←/→ change  Space toggle",
            Style::default().fg(Color::DarkGray),
        )));
        lines
    }
}

impl Widget for SettingsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines()).render(area, buf);
    }
}
