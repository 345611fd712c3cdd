//! Per-window UI state.
//!
//! Each window owns its project document privately. Changes reach disk only
//! through a save request to the shell.

use std::path::PathBuf;

use super::editor::Editor;
use super::pagination::Pagination;
use super::settings::SettingsForm;
use crate::project::ProjectDocument;
use crate::shell::WindowId;
use crate::warehouse::{DatasetInfo, JobInfo, QueryResult};

/// Tabs of the lower pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Results,
    JobInfo,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Results, Tab::JobInfo, Tab::Settings];

    pub fn title(self) -> &'static str {
        match self {
            Self::Results => "Results",
            Self::JobInfo => "Job Info",
            Self::Settings => "Settings",
        }
    }
}

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Editor,
    Tab,
    Sidebar,
}

/// State of one project window.
#[derive(Debug)]
pub struct WindowState {
    pub id: WindowId,
    pub document: ProjectDocument,
    pub path: Option<PathBuf>,
    pub editor: Editor,
    pub tab: Tab,
    pub pane: Pane,
    pub pagination: Pagination,
    pub sidebar_collapsed: bool,
    /// Highlighted row in the sessions sidebar.
    pub sidebar_cursor: usize,
    pub datasets: Vec<DatasetInfo>,
    pub settings: SettingsForm,
    pub is_running: bool,
    pub error: Option<String>,
    pub status: Option<String>,
}

impl WindowState {
    pub fn new(id: WindowId, document: ProjectDocument, path: Option<PathBuf>) -> Self {
        let mut editor = Editor::new();
        if let Some(session) = document.active_session() {
            editor.set_text(&session.query);
        }
        let settings = SettingsForm::from_document(&document);
        let sidebar_cursor = active_index(&document).unwrap_or(0);

        Self {
            id,
            document,
            path,
            editor,
            tab: Tab::default(),
            pane: Pane::default(),
            pagination: Pagination::default(),
            sidebar_collapsed: false,
            sidebar_cursor,
            datasets: Vec::new(),
            settings,
            is_running: false,
            error: None,
            status: None,
        }
    }

    /// Title for headers and the window switcher.
    pub fn title(&self) -> String {
        if let Some(name) = self
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
        {
            return name;
        }
        match &self.document.project_id {
            Some(id) => id.clone(),
            None => "Untitled project".to_string(),
        }
    }

    pub fn results(&self) -> Option<&QueryResult> {
        self.document.active_session()?.results.as_ref()
    }

    pub fn job_info(&self) -> Option<&JobInfo> {
        self.document.active_session()?.job_info.as_ref()
    }

    /// Copies the editor text into the active session.
    pub fn sync_editor(&mut self) {
        let text = self.editor.text();
        if let Some(session) = self.document.active_session_mut() {
            session.query = text;
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.status = None;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
        self.error = None;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        if self.sidebar_collapsed && self.pane == Pane::Sidebar {
            self.pane = Pane::Editor;
        }
    }

    /// Cycles focus: editor, tab pane, then the sidebar when it is expanded.
    pub fn next_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Editor => Pane::Tab,
            Pane::Tab if !self.sidebar_collapsed => Pane::Sidebar,
            Pane::Tab | Pane::Sidebar => Pane::Editor,
        };
    }

    pub fn show_tab(&mut self, tab: Tab) {
        self.tab = tab;
        if tab == Tab::Settings {
            self.settings.reset(&self.document);
        }
    }

    /// Appends an empty session and shows it.
    pub fn new_session(&mut self) {
        self.sync_editor();
        self.document.create_session();
        self.after_session_change();
    }

    /// Activates the session under the sidebar cursor.
    pub fn select_highlighted_session(&mut self) {
        let Some(id) = self
            .document
            .sessions
            .get(self.sidebar_cursor)
            .map(|s| s.id.clone())
        else {
            return;
        };
        self.sync_editor();
        if let Err(e) = self.document.select_session(&id) {
            self.set_error(e.to_string());
            return;
        }
        self.after_session_change();
    }

    /// Deletes the session under the sidebar cursor.
    pub fn delete_highlighted_session(&mut self) {
        let Some(id) = self
            .document
            .sessions
            .get(self.sidebar_cursor)
            .map(|s| s.id.clone())
        else {
            return;
        };
        let was_active = self.document.active_session_id.as_deref() == Some(id.as_str());
        self.sync_editor();
        if let Err(e) = self.document.delete_session(&id) {
            self.set_error(e.to_string());
            return;
        }
        if was_active {
            self.after_session_change();
        } else {
            self.sidebar_cursor = self
                .sidebar_cursor
                .min(self.document.sessions.len().saturating_sub(1));
        }
    }

    pub fn sidebar_up(&mut self) {
        self.sidebar_cursor = self.sidebar_cursor.saturating_sub(1);
    }

    pub fn sidebar_down(&mut self) {
        if self.sidebar_cursor + 1 < self.document.sessions.len() {
            self.sidebar_cursor += 1;
        }
    }

    /// Reloads the editor and view from the active session.
    pub fn after_session_change(&mut self) {
        let query = self
            .document
            .active_session()
            .map(|s| s.query.clone())
            .unwrap_or_default();
        self.editor.set_text(&query);
        self.refresh_view();
    }

    /// Resets the results view to the active session, leaving the editor.
    pub fn refresh_view(&mut self) {
        self.sidebar_cursor = active_index(&self.document).unwrap_or(0);
        self.pagination.first();
        self.error = None;
    }

    pub fn row_count(&self) -> usize {
        self.results().map(|r| r.rows.len()).unwrap_or(0)
    }
}

fn active_index(document: &ProjectDocument) -> Option<usize> {
    let id = document.active_session_id.as_deref()?;
    document.sessions.iter().position(|s| s.id == id)
}
