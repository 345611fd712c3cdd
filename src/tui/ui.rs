//! UI rendering for the TUI.
//!
//! Defines the layout and renders all UI components.

use super::app::{ActiveDialog, App};
use super::widgets::{
    confirm, editor::EditorPane, header, job_info::JobInfoView, prompt, settings::SettingsView,
    sidebar::Sidebar, table::ResultTable, tabs::TabBar, toast::Toast,
};
use super::window::{Pane, Tab, WindowState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEY_HINTS: &str =
    "F5 run  ^S save  ^O open  ^N new window  ^T new session  ^B sidebar  ^W close  ^Q quit";

/// Renders the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header / window switcher
            Constraint::Min(6),    // Window body
            Constraint::Length(1), // Error / status line
        ])
        .split(area);

    render_header(frame, main_layout[0], app);

    match app.window() {
        Some(window) => {
            render_window(frame, main_layout[1], window);
            render_status(frame, main_layout[2], window);
        }
        None => {
            let placeholder = Paragraph::new(Line::from(Span::styled(
                "No open project. Ctrl+N creates one, Ctrl+O opens a file.",
                Style::default().fg(Color::DarkGray),
            )));
            frame.render_widget(placeholder, main_layout[1]);
        }
    }

    if let Some(toast) = &app.toast {
        frame.render_widget(Toast::new(&toast.message), Toast::area(area));
    }

    match app.dialog() {
        Some(ActiveDialog::Confirm {
            estimated_bytes,
            threshold_bytes,
            ..
        }) => confirm::render_confirm_dialog(frame, *estimated_bytes, *threshold_bytes),
        Some(ActiveDialog::Prompt { kind, input, .. }) => {
            prompt::render_path_prompt(frame, *kind, input)
        }
        None => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<String> = app.windows.iter().map(WindowState::title).collect();
    let entries = app
        .windows
        .iter()
        .zip(titles.iter())
        .map(|(window, title)| header::WindowTitle {
            title,
            focused: app.focused == Some(window.id),
            running: window.is_running,
        })
        .collect();
    frame.render_widget(header::Header::new(entries), area);
}

fn render_window(frame: &mut Frame, area: Rect, window: &WindowState) {
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(Sidebar::width(window.sidebar_collapsed)),
            Constraint::Min(20),
        ])
        .split(area);

    let sidebar = Sidebar::new(
        &window.document.sessions,
        window.document.active_session_id.as_deref(),
        window.sidebar_cursor,
        window.sidebar_collapsed,
        window.pane == Pane::Sidebar,
    );
    frame.render_widget(sidebar, body[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35), // Editor
            Constraint::Length(1),      // Tab bar
            Constraint::Min(3),         // Tab content
        ])
        .split(body[1]);

    render_editor(frame, main[0], window);
    frame.render_widget(TabBar::new(window.tab), main[1]);
    render_tab(frame, main[2], window);
}

fn render_editor(frame: &mut Frame, area: Rect, window: &WindowState) {
    let focused = window.pane == Pane::Editor;
    let pane = EditorPane::new(&window.editor, focused, window.is_running);
    let cursor = pane.cursor_position(area);
    frame.render_widget(pane, area);

    if focused {
        if let Some(position) = cursor {
            frame.set_cursor_position(position);
        }
    }
}

fn render_tab(frame: &mut Frame, area: Rect, window: &WindowState) {
    let focused = window.pane == Pane::Tab;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match window.tab {
        Tab::Results => match window.results() {
            _ if window.is_running => frame.render_widget(muted("Loading..."), inner),
            Some(result) if !result.is_empty() => {
                frame.render_widget(ResultTable::new(result, window.pagination), inner)
            }
            _ => frame.render_widget(muted("No results to display"), inner),
        },
        Tab::JobInfo => frame.render_widget(JobInfoView::new(window.job_info()), inner),
        Tab::Settings => frame.render_widget(
            SettingsView::new(
                &window.settings,
                &window.document,
                window.datasets.len(),
                focused,
            ),
            inner,
        ),
    }
}

fn muted(text: &'static str) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::DarkGray),
    )))
}

/// The error line: an error in red, else the last status, else key hints.
fn render_status(frame: &mut Frame, area: Rect, window: &WindowState) {
    let line = match (&window.error, &window.status) {
        (Some(error), _) => Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::Red),
        )),
        (None, Some(status)) => Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Gray),
        )),
        (None, None) => Line::from(Span::styled(
            format!(" {KEY_HINTS}"),
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}
