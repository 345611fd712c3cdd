//! Application state for the TUI.
//!
//! `App` is plain state: keys and background replies go in, and at most one
//! [`Action`] comes out for the event loop to run against the shell.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::dialogs::DialogRequest;
use super::events::{command_for, Command};
use super::settings::{SettingsChange, SettingsField};
use super::window::{Pane, Tab, WindowState};
use super::UiMessage;
use crate::project::ProjectDocument;
use crate::query::{apply_outcome, DispatchOutcome, DispatchSettings};
use crate::shell::{ConfirmDecision, OpenProjectOutcome, OpenTarget, WindowId};
use crate::warehouse::format_bytes;

const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Work for the event loop. Each action becomes one shell request.
#[derive(Debug)]
pub enum Action {
    Run {
        window: WindowId,
        /// Session the query was started from.
        session: Option<String>,
        sql: String,
        settings: DispatchSettings,
    },
    Save {
        window: WindowId,
        document: ProjectDocument,
        save_as: bool,
    },
    Open(OpenTarget),
    NewWindow,
    Close(WindowId),
    Focus(WindowId),
    LoadDatasets(WindowId),
    SetProjectId {
        window: WindowId,
        project_id: Option<String>,
    },
    Quit,
}

/// What a path prompt is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Save,
    Open,
}

impl PromptKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Save => "Save Project As",
            Self::Open => "Open Project",
        }
    }
}

/// A modal dialog on screen.
#[derive(Debug)]
pub enum ActiveDialog {
    Confirm {
        estimated_bytes: u64,
        threshold_bytes: u64,
        reply: oneshot::Sender<ConfirmDecision>,
    },
    Prompt {
        kind: PromptKind,
        input: String,
        reply: oneshot::Sender<Option<PathBuf>>,
    },
}

impl From<DialogRequest> for ActiveDialog {
    fn from(request: DialogRequest) -> Self {
        match request {
            DialogRequest::ConfirmLargeQuery {
                estimated_bytes,
                threshold_bytes,
                reply,
            } => Self::Confirm {
                estimated_bytes,
                threshold_bytes,
                reply,
            },
            DialogRequest::SavePath { suggested, reply } => Self::Prompt {
                kind: PromptKind::Save,
                input: suggested
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                reply,
            },
            DialogRequest::OpenPath { reply } => Self::Prompt {
                kind: PromptKind::Open,
                input: String::new(),
                reply,
            },
        }
    }
}

/// A short-lived notification.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    expires_at: Instant,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub windows: Vec<WindowState>,
    pub focused: Option<WindowId>,
    /// Dialogs in arrival order; the front one is shown.
    pub dialogs: VecDeque<ActiveDialog>,
    pub toast: Option<Toast>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            running: true,
            windows: Vec::new(),
            focused: None,
            dialogs: VecDeque::new(),
            toast: None,
        }
    }

    pub fn window(&self) -> Option<&WindowState> {
        let id = self.focused?;
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn window_mut(&mut self) -> Option<&mut WindowState> {
        let id = self.focused?;
        self.windows.iter_mut().find(|w| w.id == id)
    }

    fn window_by_id(&mut self, id: WindowId) -> Option<&mut WindowState> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    pub fn dialog(&self) -> Option<&ActiveDialog> {
        self.dialogs.front()
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    pub fn clear_expired_toast(&mut self) {
        if self
            .toast
            .as_ref()
            .is_some_and(|t| Instant::now() >= t.expires_at)
        {
            self.toast = None;
        }
    }

    /// Shows a failure on the focused window, or as a toast without one.
    fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        match self.window_mut() {
            Some(window) => window.set_error(message),
            None => self.show_toast(message),
        }
    }

    fn add_window(&mut self, window: WindowState) -> Option<Action> {
        let id = window.id;
        let has_project = window.document.project_id.is_some();
        self.windows.push(window);
        self.focused = Some(id);
        has_project.then_some(Action::LoadDatasets(id))
    }

    // Keys

    /// Handles a key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if !self.dialogs.is_empty() {
            self.handle_dialog_key(key);
            return None;
        }

        if let Some(command) = command_for(&key) {
            return self.handle_command(command);
        }

        let window = self.window_mut()?;
        if key.code == KeyCode::Esc {
            window.pane = Pane::Editor;
            return None;
        }

        match (window.pane, window.tab) {
            (Pane::Editor, _) => {
                handle_editor_key(window, key);
                None
            }
            (Pane::Sidebar, _) => {
                handle_sidebar_key(window, key);
                None
            }
            (Pane::Tab, Tab::Results) => {
                handle_results_key(window, key);
                None
            }
            (Pane::Tab, Tab::JobInfo) => None,
            (Pane::Tab, Tab::Settings) => self.handle_settings_key(key),
        }
    }

    fn handle_command(&mut self, command: Command) -> Option<Action> {
        match command {
            Command::Quit => {
                self.running = false;
                return Some(Action::Quit);
            }
            Command::Open => return Some(Action::Open(OpenTarget::Dialog)),
            Command::NewWindow => return Some(Action::NewWindow),
            Command::NextWindow => return self.focus_next_window(),
            _ => {}
        }

        let window = self.window_mut()?;
        match command {
            Command::RunQuery => {
                if window.is_running {
                    window.set_status("A query is already running");
                    return None;
                }
                window.is_running = true;
                window.set_status("Running query...");
                Some(Action::Run {
                    window: window.id,
                    session: window.document.active_session_id.clone(),
                    sql: window.editor.text(),
                    settings: DispatchSettings::from(&window.document),
                })
            }
            Command::Save | Command::SaveAs => {
                window.sync_editor();
                Some(Action::Save {
                    window: window.id,
                    document: window.document.clone(),
                    save_as: command == Command::SaveAs,
                })
            }
            Command::NewSession => {
                window.new_session();
                None
            }
            Command::ToggleSidebar => {
                window.toggle_sidebar();
                None
            }
            Command::CloseWindow => Some(Action::Close(window.id)),
            Command::ShowResults => {
                window.show_tab(Tab::Results);
                None
            }
            Command::ShowJobInfo => {
                window.show_tab(Tab::JobInfo);
                None
            }
            Command::ShowSettings => {
                window.show_tab(Tab::Settings);
                window.pane = Pane::Tab;
                None
            }
            Command::NextPane => {
                window.next_pane();
                None
            }
            Command::Quit | Command::Open | Command::NewWindow | Command::NextWindow => None,
        }
    }

    fn focus_next_window(&mut self) -> Option<Action> {
        if self.windows.len() < 2 {
            return None;
        }
        let index = self
            .focused
            .and_then(|id| self.windows.iter().position(|w| w.id == id))
            .map_or(0, |i| (i + 1) % self.windows.len());
        let id = self.windows[index].id;
        self.focused = Some(id);
        Some(Action::Focus(id))
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Option<Action> {
        let window = self.window_mut()?;
        let WindowState {
            settings,
            document,
            datasets,
            ..
        } = &mut *window;

        let change = match key.code {
            KeyCode::Up => {
                settings.select_prev();
                SettingsChange::None
            }
            KeyCode::Down => {
                settings.select_next();
                SettingsChange::None
            }
            KeyCode::Left => settings.cycle(document, datasets, false),
            KeyCode::Right => settings.cycle(document, datasets, true),
            KeyCode::Enter => settings.commit(document),
            KeyCode::Backspace => {
                settings.backspace();
                SettingsChange::None
            }
            KeyCode::Char(' ') if settings.selected == SettingsField::ShowWarning => {
                settings.toggle(document)
            }
            KeyCode::Char(c) if settings.is_editing_text() => {
                settings.input(c);
                SettingsChange::None
            }
            _ => SettingsChange::None,
        };

        match change {
            SettingsChange::None => None,
            SettingsChange::Updated => {
                window.error = None;
                None
            }
            SettingsChange::ProjectId(project_id) => {
                window.datasets.clear();
                window.document.default_dataset = None;
                Some(Action::SetProjectId {
                    window: window.id,
                    project_id,
                })
            }
            SettingsChange::Invalid(message) => {
                window.set_error(message);
                None
            }
        }
    }

    /// Inserts pasted text into the path prompt or the focused editor.
    pub fn handle_paste(&mut self, text: &str) {
        if let Some(dialog) = self.dialogs.front_mut() {
            if let ActiveDialog::Prompt { input, .. } = dialog {
                input.push_str(text.lines().next().unwrap_or_default());
            }
            return;
        }

        if let Some(window) = self.window_mut() {
            if window.pane == Pane::Editor {
                window.editor.insert_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
            }
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.dialogs.front_mut() else {
            return;
        };

        let close = match dialog {
            ActiveDialog::Confirm { .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    Some(Answer::Confirm(ConfirmDecision::confirm()))
                }
                KeyCode::Char('d') | KeyCode::Char('D') => Some(Answer::Confirm(
                    ConfirmDecision::confirm().and_dont_show_again(),
                )),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    Some(Answer::Confirm(ConfirmDecision::decline()))
                }
                _ => None,
            },
            ActiveDialog::Prompt { input, .. } => match key.code {
                KeyCode::Enter if !input.trim().is_empty() => {
                    Some(Answer::Path(Some(PathBuf::from(input.trim()))))
                }
                KeyCode::Esc => Some(Answer::Path(None)),
                KeyCode::Backspace => {
                    input.pop();
                    None
                }
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    input.push(c);
                    None
                }
                _ => None,
            },
        };

        let Some(answer) = close else {
            return;
        };

        let sent = match (self.dialogs.pop_front(), answer) {
            (Some(ActiveDialog::Confirm { reply, .. }), Answer::Confirm(decision)) => {
                reply.send(decision).is_ok()
            }
            (Some(ActiveDialog::Prompt { reply, .. }), Answer::Path(path)) => {
                reply.send(path).is_ok()
            }
            _ => true,
        };
        if !sent {
            warn!("Dialog answer dropped, requester went away");
        }
    }

    // Background replies

    /// Applies a message from a background task.
    pub fn handle_message(&mut self, message: UiMessage) -> Option<Action> {
        match message {
            UiMessage::Dialog(request) => {
                self.dialogs.push_back(request.into());
                None
            }
            UiMessage::Dispatched {
                window,
                session,
                sql,
                result,
            } => {
                let window = self.window_by_id(window)?;
                window.is_running = false;
                match result {
                    Ok(outcome) => apply_dispatch(window, session.as_deref(), &sql, &outcome),
                    Err(e) => window.set_error(e.to_string()),
                }
                None
            }
            UiMessage::Saved { window, result } => {
                match result {
                    Ok(outcome) if outcome.success => {
                        if let Some(w) = self.window_by_id(window) {
                            w.path = outcome.path;
                            w.error = None;
                        }
                        self.show_toast(outcome.message);
                    }
                    Ok(outcome) if outcome.is_cancelled() => {
                        self.show_toast(outcome.message);
                    }
                    Ok(outcome) => self.report_error(outcome.message),
                    Err(e) => self.report_error(e.to_string()),
                }
                None
            }
            UiMessage::Opened(result) => self.handle_opened(result),
            UiMessage::Created(result) => match result {
                Ok((id, document)) => self.add_window(WindowState::new(id, document, None)),
                Err(e) => {
                    self.report_error(e.to_string());
                    if self.windows.is_empty() {
                        self.running = false;
                        return Some(Action::Quit);
                    }
                    None
                }
            },
            UiMessage::Datasets { window, result } => {
                let window = self.window_by_id(window)?;
                match result {
                    Ok(datasets) => {
                        debug!(count = datasets.len(), "Datasets loaded");
                        window.datasets = datasets;
                    }
                    Err(e) => window.set_error(format!("Failed to list datasets: {e}")),
                }
                None
            }
            UiMessage::ProjectIdSet { window, result } => match result {
                Ok(true) => Some(Action::LoadDatasets(window)),
                Ok(false) => {
                    self.report_error("Window is no longer registered");
                    None
                }
                Err(e) => {
                    self.report_error(e.to_string());
                    None
                }
            },
            UiMessage::Closed { window, result } => {
                self.windows.retain(|w| w.id != window);
                self.focused = match result {
                    Ok(Some(next)) if self.windows.iter().any(|w| w.id == next) => Some(next),
                    _ => self.windows.last().map(|w| w.id),
                };
                if self.windows.is_empty() {
                    self.running = false;
                    return Some(Action::Quit);
                }
                None
            }
        }
    }

    fn handle_opened(&mut self, result: crate::error::Result<OpenProjectOutcome>) -> Option<Action> {
        let message = match result {
            Ok(OpenProjectOutcome::Opened {
                window,
                document,
                path,
            }) => return self.add_window(WindowState::new(window, document, path)),
            Ok(OpenProjectOutcome::Focused { window }) => {
                self.focused = Some(window);
                self.show_toast("Project already open");
                return None;
            }
            Ok(OpenProjectOutcome::Cancelled) => {
                self.show_toast("Open cancelled");
                None
            }
            Ok(OpenProjectOutcome::Failed { message }) => Some(message),
            Err(e) => Some(e.to_string()),
        };

        if let Some(message) = message {
            self.report_error(message);
        }
        self.windows.is_empty().then_some(Action::NewWindow)
    }
}

enum Answer {
    Confirm(ConfirmDecision),
    Path(Option<PathBuf>),
}

fn apply_dispatch(
    window: &mut WindowState,
    session: Option<&str>,
    sql: &str,
    outcome: &DispatchOutcome,
) {
    let had_active = window.document.active_session().is_some();
    let recorded = apply_outcome(&mut window.document, session, sql, outcome);
    if outcome.disable_warning() {
        window.settings.reset(&window.document);
    }

    match outcome {
        DispatchOutcome::Executed(executed) => {
            let result = &executed.response.result;
            let mut status = format!(
                "{} row{} in {} ms",
                result.row_count,
                if result.row_count == 1 { "" } else { "s" },
                executed.execution_time.as_millis()
            );
            if let Some(bytes) = executed.estimated_bytes {
                status.push_str(&format!(", estimated {}", format_bytes(bytes)));
            }
            if let Some(warning) = result.truncation_warning() {
                status.push_str(&format!(". {warning}"));
            }

            let still_active = recorded.is_some()
                && recorded.as_deref() == window.document.active_session_id.as_deref();
            if still_active {
                if had_active {
                    window.refresh_view();
                } else {
                    window.after_session_change();
                }
                window.tab = Tab::Results;
            } else if let Some(name) = recorded
                .as_deref()
                .and_then(|id| window.document.session(id))
                .map(|s| s.name.clone())
            {
                status.push_str(&format!(" (saved to {name})"));
            }
            window.set_status(status);
        }
        DispatchOutcome::Declined {
            estimated_bytes, ..
        } => {
            window.set_status(format!(
                "Query not run (estimated {})",
                format_bytes(*estimated_bytes)
            ));
        }
    }
}

fn handle_editor_key(window: &mut WindowState, key: KeyEvent) {
    let editor = &mut window.editor;
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            editor.insert(c)
        }
        KeyCode::Enter => editor.newline(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Delete => editor.delete(),
        KeyCode::Left => editor.move_left(),
        KeyCode::Right => editor.move_right(),
        KeyCode::Up => editor.move_up(),
        KeyCode::Down => editor.move_down(),
        KeyCode::Home => editor.move_home(),
        KeyCode::End => editor.move_end(),
        _ => {}
    }
}

fn handle_results_key(window: &mut WindowState, key: KeyEvent) {
    let total = window.row_count();
    let pages = &mut window.pagination;
    match key.code {
        KeyCode::Home => pages.first(),
        KeyCode::Left | KeyCode::PageUp => pages.prev(),
        KeyCode::Right | KeyCode::PageDown => pages.next(total),
        KeyCode::End => pages.last(total),
        _ => {}
    }
}

fn handle_sidebar_key(window: &mut WindowState, key: KeyEvent) {
    match key.code {
        KeyCode::Up => window.sidebar_up(),
        KeyCode::Down => window.sidebar_down(),
        KeyCode::Enter => window.select_highlighted_session(),
        KeyCode::Char('n') => window.new_session(),
        KeyCode::Char('d') | KeyCode::Delete => window.delete_highlighted_session(),
        _ => {}
    }
}
