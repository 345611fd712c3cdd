//! Integration tests for saving and opening project files through the shell.

use std::path::Path;
use std::sync::Arc;

use giant::config::ProjectSettings;
use giant::project::{self, ProjectDocument};
use giant::shell::{OpenProjectOutcome, OpenTarget, ScriptedDialogs, Shell, ShellHandle, WindowId};
use giant::warehouse::{ColumnInfo, DatasetRef, JobInfo, MockWarehouseClient, QueryResult, Value};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn start(dialogs: ScriptedDialogs) -> ShellHandle {
    let settings = ProjectSettings {
        default_project_id: None,
        warn_size_bytes: 500_000,
    };
    let (handle, shell) = Shell::spawn(
        Arc::new(MockWarehouseClient::new()),
        Arc::new(dialogs),
        settings,
    );
    tokio::spawn(shell.run());
    handle
}

fn sample_document() -> ProjectDocument {
    let mut document = ProjectDocument::new("analytics-prod").with_warn_size_bytes(2_048);
    document.show_query_size_warning = false;
    document.default_dataset = Some(DatasetRef::new("sales"));
    document.query_location = Some("EU".to_string());
    document.record_execution(
        None,
        "SELECT region, total FROM sales.orders",
        QueryResult::with_data(
            vec![
                ColumnInfo::new("region", "STRING"),
                ColumnInfo::new("total", "INTEGER"),
                ColumnInfo::new("share", "FLOAT64"),
            ],
            vec![
                vec![
                    Value::String("emea".into()),
                    Value::Int(12),
                    Value::Float("97539.6263534042505".parse().unwrap()),
                ],
                vec![
                    Value::String("apac".into()),
                    Value::Null,
                    Value::Float("0.30000000000000004".parse().unwrap()),
                ],
            ],
        ),
        Some(JobInfo {
            job_id: Some("job_42".to_string()),
            total_bytes_processed: Some(1_024),
            ..Default::default()
        }),
    );
    document.create_session();
    document
}

async fn open_window(shell: &ShellHandle, target: OpenTarget) -> (WindowId, ProjectDocument) {
    match shell.open_project(target).await.unwrap() {
        OpenProjectOutcome::Opened {
            window, document, ..
        } => (window, document),
        other => panic!("expected a new window, got {other:?}"),
    }
}

fn assert_is_file(path: &Path) {
    assert!(path.is_file(), "{} was not written", path.display());
}

#[tokio::test]
async fn test_saved_project_reopens_in_another_session() {
    let dir = tempdir().unwrap();
    let chosen = dir.path().join("projects").join("sales");
    let document = sample_document();

    let writer = start(ScriptedDialogs::new().with_save_path(&chosen));
    let (window, _) = writer.create_project(None).await.unwrap();
    let outcome = writer
        .save_project(window, document.clone(), false)
        .await
        .unwrap();
    assert!(outcome.success, "{}", outcome.message);

    let saved = chosen.with_extension("giant");
    assert_is_file(&saved);
    assert_eq!(outcome.path.as_deref(), Some(saved.as_path()));

    let reader = start(ScriptedDialogs::new());
    let (_, reopened) = open_window(&reader, OpenTarget::File(saved)).await;

    assert_eq!(reopened, document);
    assert_eq!(reopened.sessions.len(), 2);
    assert_eq!(reopened.sessions[0].name, "SELECT region, total FROM sales.orders");
    assert_eq!(reopened.active_session_id, Some(reopened.sessions[1].id.clone()));
}

#[tokio::test]
async fn test_project_file_uses_camel_case_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.giant");
    project::save(&path, &sample_document()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(raw["projectId"], "analytics-prod");
    assert_eq!(raw["warnSizeBytes"], 2_048);
    assert_eq!(raw["showQuerySizeWarning"], false);
    assert_eq!(raw["queryLocation"], "EU");
    assert!(raw["activeSessionId"].is_string());
    assert!(raw["sessions"][0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_open_dialog_path_and_dedupe() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("picked.giant");
    project::save(&path, &sample_document()).unwrap();

    let shell = start(ScriptedDialogs::new().with_open_path(&path));
    let (window, document) = open_window(&shell, OpenTarget::Dialog).await;
    assert_eq!(document.project_id.as_deref(), Some("analytics-prod"));

    // The same file through a different spelling of the path
    let indirect = dir.path().join(".").join("picked.giant");
    assert_eq!(
        shell.open_project(OpenTarget::File(indirect)).await.unwrap(),
        OpenProjectOutcome::Focused { window }
    );
}

#[tokio::test]
async fn test_project_id_windows_reopen_after_close() {
    let shell = start(ScriptedDialogs::new());

    let (window, document) =
        open_window(&shell, OpenTarget::ProjectId("analytics-prod".into())).await;
    assert_eq!(document.warn_size_bytes, 500_000);
    assert!(document.sessions.is_empty());

    assert_eq!(
        shell
            .open_project(OpenTarget::ProjectId("analytics-prod".into()))
            .await
            .unwrap(),
        OpenProjectOutcome::Focused { window }
    );

    assert_eq!(shell.close_window(window).await.unwrap(), None);

    let (reopened, _) = open_window(&shell, OpenTarget::ProjectId("analytics-prod".into())).await;
    assert_ne!(reopened, window);
}

#[tokio::test]
async fn test_save_as_moves_binding_to_new_file() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.giant");
    let second = dir.path().join("second.giant");

    let shell = start(
        ScriptedDialogs::new()
            .with_save_path(&first)
            .with_save_path(&second),
    );
    let (window, document) = shell.create_project(Some("p1".into())).await.unwrap();

    assert!(shell.save_project(window, document.clone(), false).await.unwrap().success);
    assert!(shell.save_project(window, document, true).await.unwrap().success);
    assert_is_file(&first);
    assert_is_file(&second);

    // The window now owns `second`; `first` is free to open elsewhere.
    assert_eq!(
        shell.open_project(OpenTarget::File(second)).await.unwrap(),
        OpenProjectOutcome::Focused { window }
    );
    let (other, _) = open_window(&shell, OpenTarget::File(first)).await;
    assert_ne!(other, window);
}

#[tokio::test]
async fn test_last_save_wins_for_shared_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.giant");

    let a = start(ScriptedDialogs::new().with_save_path(&path));
    let b = start(ScriptedDialogs::new().with_save_path(&path));
    let (wa, _) = a.create_project(Some("from-a".into())).await.unwrap();
    let (wb, _) = b.create_project(Some("from-b".into())).await.unwrap();

    a.save_project(wa, ProjectDocument::new("from-a"), false)
        .await
        .unwrap();
    b.save_project(wb, ProjectDocument::new("from-b"), false)
        .await
        .unwrap();

    let loaded = project::load(&path).unwrap();
    assert_eq!(loaded.project_id.as_deref(), Some("from-b"));
}
