//! Settings tab state: edits a window's project document in place.

use crate::project::ProjectDocument;
use crate::warehouse::DatasetInfo;

/// Locations offered for query execution, after "no location".
pub const LOCATION_OPTIONS: &[&str] = &[
    "US",
    "EU",
    "us-central1",
    "us-east1",
    "us-west1",
    "europe-west1",
    "europe-west2",
    "asia-northeast1",
    "asia-southeast1",
    "australia-southeast1",
];

/// Editable fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsField {
    #[default]
    ProjectId,
    WarnSize,
    ShowWarning,
    DefaultDataset,
    Location,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        Self::ProjectId,
        Self::WarnSize,
        Self::ShowWarning,
        Self::DefaultDataset,
        Self::Location,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ProjectId => "Project ID",
            Self::WarnSize => "Warn when query exceeds (bytes)",
            Self::ShowWarning => "Show query size warning",
            Self::DefaultDataset => "Default dataset",
            Self::Location => "Query execution location",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn is_text(self) -> bool {
        matches!(self, Self::ProjectId | Self::WarnSize)
    }
}

/// What a committed edit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    None,
    /// The document changed locally.
    Updated,
    /// The project id changed and the shell must learn about it.
    ProjectId(Option<String>),
    Invalid(String),
}

/// Cursor and text buffers of the settings tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub selected: SettingsField,
    pub project_input: String,
    pub warn_input: String,
}

impl SettingsForm {
    pub fn from_document(document: &ProjectDocument) -> Self {
        let mut form = Self::default();
        form.reset(document);
        form
    }

    /// Reloads the text buffers from the document, dropping unsaved edits.
    pub fn reset(&mut self, document: &ProjectDocument) {
        self.project_input = document.project_id.clone().unwrap_or_default();
        self.warn_input = document.warn_size_bytes.to_string();
    }

    pub fn select_next(&mut self) {
        self.selected = self.selected.next();
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.prev();
    }

    /// Types into the selected text field. The threshold accepts digits only.
    pub fn input(&mut self, c: char) {
        match self.selected {
            SettingsField::ProjectId if !c.is_whitespace() => self.project_input.push(c),
            SettingsField::WarnSize if c.is_ascii_digit() => self.warn_input.push(c),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.selected {
            SettingsField::ProjectId => {
                self.project_input.pop();
            }
            SettingsField::WarnSize => {
                self.warn_input.pop();
            }
            _ => {}
        }
    }

    /// Applies the selected text field to the document.
    pub fn commit(&mut self, document: &mut ProjectDocument) -> SettingsChange {
        match self.selected {
            SettingsField::ProjectId => {
                let value = Some(self.project_input.trim().to_string()).filter(|p| !p.is_empty());
                if value == document.project_id {
                    return SettingsChange::None;
                }
                document.project_id = value.clone();
                SettingsChange::ProjectId(value)
            }
            SettingsField::WarnSize => match self.warn_input.parse::<u64>() {
                Ok(bytes) => {
                    document.warn_size_bytes = bytes;
                    SettingsChange::Updated
                }
                Err(_) => {
                    self.warn_input = document.warn_size_bytes.to_string();
                    SettingsChange::Invalid("Threshold must be a whole number of bytes".into())
                }
            },
            SettingsField::ShowWarning => self.toggle(document),
            _ => SettingsChange::None,
        }
    }

    pub fn toggle(&mut self, document: &mut ProjectDocument) -> SettingsChange {
        if self.selected != SettingsField::ShowWarning {
            return SettingsChange::None;
        }
        document.show_query_size_warning = !document.show_query_size_warning;
        SettingsChange::Updated
    }

    /// Steps the selected choice field forward or back.
    ///
    /// Both choice lists start with "none", so cycling passes through unset.
    pub fn cycle(
        &mut self,
        document: &mut ProjectDocument,
        datasets: &[DatasetInfo],
        forward: bool,
    ) -> SettingsChange {
        match self.selected {
            SettingsField::DefaultDataset => {
                let current = document.default_dataset.as_ref().and_then(|d| {
                    datasets.iter().position(|ds| ds.id == d.dataset_id)
                });
                let next = step(current, datasets.len(), forward);
                document.default_dataset = next.map(|i| datasets[i].to_ref());
                SettingsChange::Updated
            }
            SettingsField::Location => {
                let current = document
                    .query_location
                    .as_deref()
                    .and_then(|l| LOCATION_OPTIONS.iter().position(|o| *o == l));
                let next = step(current, LOCATION_OPTIONS.len(), forward);
                document.query_location = next.map(|i| LOCATION_OPTIONS[i].to_string());
                SettingsChange::Updated
            }
            SettingsField::ShowWarning => self.toggle(document),
            _ => SettingsChange::None,
        }
    }

    /// Whether typing goes to the selected field.
    pub fn is_editing_text(&self) -> bool {
        self.selected.is_text()
    }
}

/// Steps through `None, Some(0), .., Some(len - 1)` cyclically.
fn step(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match (current, forward) {
        (None, true) => Some(0),
        (None, false) => Some(len - 1),
        (Some(i), true) if i + 1 < len => Some(i + 1),
        (Some(_), true) => None,
        (Some(0), false) => None,
        (Some(i), false) => Some(i - 1),
    }
}
