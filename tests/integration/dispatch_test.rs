//! Integration tests for query dispatch through a running shell.

use std::sync::Arc;

use giant::config::ProjectSettings;
use giant::project::ProjectDocument;
use giant::query::{apply_outcome, DispatchOutcome, DispatchSettings, QueryDispatcher};
use giant::shell::{ConfirmDecision, ScriptedDialogs, Shell};
use giant::warehouse::{MockCall, MockWarehouseClient};
use pretty_assertions::assert_eq;

const GIB: u64 = 1_073_741_824;

fn start(
    client: MockWarehouseClient,
    dialogs: ScriptedDialogs,
) -> (QueryDispatcher, Arc<MockWarehouseClient>, Arc<ScriptedDialogs>) {
    let client = Arc::new(client);
    let dialogs = Arc::new(dialogs);
    let (handle, shell) = Shell::spawn(client.clone(), dialogs.clone(), ProjectSettings::default());
    tokio::spawn(shell.run());
    (QueryDispatcher::new(handle), client, dialogs)
}

#[tokio::test]
async fn test_dont_show_again_stops_later_estimates() {
    let (dispatcher, client, dialogs) = start(
        MockWarehouseClient::new().with_dry_run_bytes(3 * GIB),
        ScriptedDialogs::new().with_confirm(ConfirmDecision::confirm().and_dont_show_again()),
    );
    let mut document = ProjectDocument::new("proj-a");

    let sql = "SELECT * FROM big_table";
    let outcome = dispatcher
        .dispatch(sql, &DispatchSettings::from(&document))
        .await
        .unwrap();
    apply_outcome(&mut document, None, sql, &outcome);

    assert!(!document.show_query_size_warning);
    assert_eq!(document.sessions.len(), 1);
    assert_eq!(dialogs.confirm_requests(), vec![(3 * GIB, GIB)]);

    let outcome = dispatcher
        .dispatch(sql, &DispatchSettings::from(&document))
        .await
        .unwrap();
    let active = document.active_session_id.clone();
    apply_outcome(&mut document, active.as_deref(), sql, &outcome);

    assert_eq!(client.dry_run_count(), 1);
    assert_eq!(client.executed_queries().len(), 2);
    assert_eq!(dialogs.confirm_requests().len(), 1);
    // Re-running in the same session updates it in place
    assert_eq!(document.sessions.len(), 1);
}

#[tokio::test]
async fn test_declined_query_leaves_sessions_alone() {
    let (dispatcher, client, _) = start(
        MockWarehouseClient::new().with_dry_run_bytes(2 * GIB),
        ScriptedDialogs::new().with_confirm(ConfirmDecision::decline()),
    );
    let mut document = ProjectDocument::new("proj-a");

    let outcome = dispatcher
        .dispatch("SELECT 1", &DispatchSettings::from(&document))
        .await
        .unwrap();
    apply_outcome(&mut document, None, "SELECT 1", &outcome);

    assert!(matches!(
        outcome,
        DispatchOutcome::Declined {
            estimated_bytes,
            disable_warning: false
        } if estimated_bytes == 2 * GIB
    ));
    assert!(document.sessions.is_empty());
    assert!(document.show_query_size_warning);
    assert!(client.executed_queries().is_empty());
}

#[tokio::test]
async fn test_zero_threshold_skips_estimate() {
    let (dispatcher, client, _) = start(
        MockWarehouseClient::new().with_dry_run_bytes(5 * GIB),
        ScriptedDialogs::new(),
    );
    let document = ProjectDocument::new("proj-a").with_warn_size_bytes(0);

    let outcome = dispatcher
        .dispatch("SELECT 1", &DispatchSettings::from(&document))
        .await
        .unwrap();

    assert!(matches!(outcome, DispatchOutcome::Executed(_)));
    assert_eq!(client.dry_run_count(), 0);
}

#[tokio::test]
async fn test_warehouse_failure_reaches_caller() {
    let (dispatcher, _, _) = start(
        MockWarehouseClient::new().failing("Access Denied: Project proj-a"),
        ScriptedDialogs::new(),
    );

    let err = dispatcher
        .dispatch("SELECT 1", &DispatchSettings::from(&ProjectDocument::new("proj-a")))
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Query Error");
    assert!(err.to_string().contains("Access Denied"));
}

#[tokio::test]
async fn test_windows_dispatch_concurrently() {
    let (dispatcher, client, _) = start(MockWarehouseClient::new(), ScriptedDialogs::new());
    let a = DispatchSettings::from(&ProjectDocument::new("proj-a"));
    let b = DispatchSettings::from(&ProjectDocument::new("proj-b"));

    let (first, second) = tokio::join!(
        dispatcher.dispatch("SELECT 'a'", &a),
        dispatcher.dispatch("SELECT 'b'", &b),
    );
    assert!(matches!(first.unwrap(), DispatchOutcome::Executed(_)));
    assert!(matches!(second.unwrap(), DispatchOutcome::Executed(_)));

    let mut projects: Vec<_> = client
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MockCall::Execute(request) => Some(request.project_id),
            _ => None,
        })
        .collect();
    projects.sort();
    assert_eq!(projects, vec!["proj-a".to_string(), "proj-b".to_string()]);
}
