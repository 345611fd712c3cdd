//! Keyboard-driven flows through the UI state, the runner and the shell.

use crossterm::event::KeyCode;
use giant::config::ProjectSettings;
use giant::shell::OpenTarget;
use giant::tui::app::{ActiveDialog, PromptKind};
use giant::tui::window::Tab;
use giant::tui::Action;
use giant::warehouse::{DatasetInfo, MockCall, MockWarehouseClient};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use super::common::Harness;

const GIB: u64 = 1_073_741_824;

fn defaults(project_id: Option<&str>) -> ProjectSettings {
    ProjectSettings {
        default_project_id: project_id.map(String::from),
        ..ProjectSettings::default()
    }
}

fn datasets() -> Vec<DatasetInfo> {
    vec![
        DatasetInfo {
            id: "sales".to_string(),
            project_id: "proj-a".to_string(),
            location: Some("US".to_string()),
        },
        DatasetInfo {
            id: "marketing".to_string(),
            project_id: "proj-a".to_string(),
            location: Some("US".to_string()),
        },
    ]
}

#[tokio::test]
async fn test_run_confirm_save_and_close() {
    let dir = tempdir().unwrap();
    let mut h = Harness::start(
        MockWarehouseClient::new().with_datasets(datasets()),
        defaults(Some("proj-a")),
    );

    // New window, then its dataset list
    h.perform(Action::NewWindow);
    h.step().await;
    h.step().await;
    assert_eq!(h.app.window().unwrap().datasets.len(), 2);

    // A small query runs without asking
    h.type_text("SELECT 1");
    h.press_code(KeyCode::F(5));
    assert!(h.app.window().unwrap().is_running);
    h.step().await;

    let window = h.app.window().unwrap();
    assert!(!window.is_running);
    assert_eq!(window.results().unwrap().row_count, 1);
    assert_eq!(window.document.sessions.len(), 1);
    assert_eq!(window.document.sessions[0].name, "SELECT 1");
    assert!(window.status.as_deref().unwrap().starts_with("1 row in"));

    // A large one asks first; "d" confirms and turns the warning off
    h.client.set_dry_run_bytes(2 * GIB);
    h.press_code(KeyCode::F(5));
    h.step().await;
    match h.app.dialog() {
        Some(ActiveDialog::Confirm {
            estimated_bytes,
            threshold_bytes,
            ..
        }) => assert_eq!((*estimated_bytes, *threshold_bytes), (2 * GIB, GIB)),
        other => panic!("expected a confirm dialog, got {other:?}"),
    }
    h.press_code(KeyCode::Char('d'));
    h.step().await;

    let window = h.app.window().unwrap();
    assert!(h.app.dialog().is_none());
    assert!(!window.document.show_query_size_warning);
    assert_eq!(window.document.sessions.len(), 1);
    assert_eq!(window.tab, Tab::Results);
    assert_eq!(h.client.executed_queries().len(), 2);

    // First save asks for a path
    h.ctrl('s');
    h.step().await;
    assert!(matches!(
        h.app.dialog(),
        Some(ActiveDialog::Prompt {
            kind: PromptKind::Save,
            ..
        })
    ));
    let target = dir.path().join("report");
    h.type_text(&target.display().to_string());
    h.press_code(KeyCode::Enter);
    h.step().await;

    let saved = target.with_extension("giant");
    assert!(saved.is_file());
    assert_eq!(h.app.window().unwrap().path.as_deref(), Some(saved.as_path()));
    assert!(h.app.toast.as_ref().unwrap().message.starts_with("Saved to"));

    // The second save goes straight to the bound file
    h.ctrl('s');
    h.step().await;
    assert!(h.app.dialog().is_none());
    assert!(h.app.window().unwrap().error.is_none());

    let on_disk = giant::project::load(&saved).unwrap();
    assert_eq!(on_disk.sessions[0].query, "SELECT 1");
    assert!(!on_disk.show_query_size_warning);

    // Closing the last window quits
    h.ctrl('w');
    h.step().await;
    assert!(!h.app.running);
    assert!(h.app.windows.is_empty());
}

#[tokio::test]
async fn test_declined_query_reports_estimate() {
    let mut h = Harness::start(
        MockWarehouseClient::new().with_dry_run_bytes(3 * GIB),
        defaults(Some("proj-a")),
    );
    h.perform(Action::NewWindow);
    h.step().await;
    h.step().await;

    h.type_text("SELECT * FROM huge");
    h.press_code(KeyCode::F(5));
    h.step().await;
    h.press_code(KeyCode::Char('n'));
    h.step().await;

    let window = h.app.window().unwrap();
    assert_eq!(window.status.as_deref(), Some("Query not run (estimated 3 GB)"));
    assert!(window.document.sessions.is_empty());
    assert!(window.document.show_query_size_warning);
    assert!(h.client.executed_queries().is_empty());
}

#[tokio::test]
async fn test_cancelled_open_without_windows_creates_one() {
    let mut h = Harness::start(MockWarehouseClient::new(), defaults(None));

    h.perform(Action::Open(OpenTarget::Dialog));
    h.step().await;
    assert!(matches!(
        h.app.dialog(),
        Some(ActiveDialog::Prompt {
            kind: PromptKind::Open,
            ..
        })
    ));

    h.press_code(KeyCode::Esc);
    h.step().await;
    assert_eq!(h.app.toast.as_ref().unwrap().message, "Open cancelled");

    // No project id, so no dataset load follows
    h.step().await;
    assert_eq!(h.app.windows.len(), 1);
    assert_eq!(h.app.window().unwrap().title(), "Untitled project");
}

#[tokio::test]
async fn test_run_without_project_id_shows_error() {
    let mut h = Harness::start(MockWarehouseClient::new(), defaults(None));
    h.perform(Action::NewWindow);
    h.step().await;

    h.type_text("SELECT 1");
    h.press_code(KeyCode::F(5));
    h.step().await;

    let window = h.app.window().unwrap();
    assert!(window.error.as_deref().unwrap().contains("No project id"));
    assert!(h.client.calls().is_empty());
}

#[tokio::test]
async fn test_reopening_project_focuses_existing_window() {
    let mut h = Harness::start(MockWarehouseClient::new(), defaults(None));

    h.perform(Action::Open(OpenTarget::ProjectId("proj-a".into())));
    h.step().await;
    h.step().await;
    let first = h.app.focused.unwrap();

    h.perform(Action::Open(OpenTarget::ProjectId("proj-b".into())));
    h.step().await;
    h.step().await;
    assert_eq!(h.app.windows.len(), 2);
    assert_ne!(h.app.focused, Some(first));

    h.perform(Action::Open(OpenTarget::ProjectId("proj-a".into())));
    h.step().await;
    assert_eq!(h.app.windows.len(), 2);
    assert_eq!(h.app.focused, Some(first));
    assert_eq!(h.app.toast.as_ref().unwrap().message, "Project already open");
}

#[tokio::test]
async fn test_changing_project_id_reloads_datasets() {
    let mut h = Harness::start(
        MockWarehouseClient::new().with_datasets(datasets()),
        defaults(Some("proj-a")),
    );
    h.perform(Action::NewWindow);
    h.step().await;
    h.step().await;

    h.press_code(KeyCode::F(4));
    h.type_text("-eu");
    h.press_code(KeyCode::Enter);
    assert!(h.app.window().unwrap().datasets.is_empty());

    // ProjectIdSet, then the reload it triggers
    h.step().await;
    h.step().await;

    let window = h.app.window().unwrap();
    assert_eq!(window.document.project_id.as_deref(), Some("proj-a-eu"));
    assert_eq!(window.datasets.len(), 2);
    assert_eq!(
        h.client.calls().last(),
        Some(&MockCall::ListDatasets("proj-a-eu".to_string()))
    );
}
