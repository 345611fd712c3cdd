//! Integration tests for the BigQuery REST client against a local stub.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use giant::config::WarehouseSettings;
use giant::warehouse::{
    BigQueryClient, DatasetRef, QueryRequest, Value, WarehouseClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::spawn_stub;

#[derive(Default)]
struct Stub {
    /// "METHOD path" of every request, oldest first.
    requests: Mutex<Vec<String>>,
    auth_headers: Mutex<Vec<String>>,
    bodies: Mutex<Vec<serde_json::Value>>,
    polls: AtomicUsize,
}

impl Stub {
    fn record(&self, line: String, headers: &HeaderMap) {
        self.requests.lock().unwrap().push(line);
        if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            self.auth_headers.lock().unwrap().push(value.to_string());
        }
    }
}

fn schema() -> serde_json::Value {
    json!({
        "fields": [
            { "name": "name", "type": "STRING", "mode": "NULLABLE" },
            { "name": "n", "type": "INTEGER", "mode": "NULLABLE" }
        ]
    })
}

fn row(name: &str, n: i64) -> serde_json::Value {
    json!({ "f": [{ "v": name }, { "v": n.to_string() }] })
}

async fn submit(
    State(stub): State<Arc<Stub>>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    stub.record(format!("POST {project}/queries"), &headers);
    stub.bodies.lock().unwrap().push(body.clone());

    if project == "denied" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "Request had invalid authentication credentials." } })),
        )
            .into_response();
    }

    if project == "broken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "Syntax error: Unexpected end of script" } })),
        )
            .into_response();
    }

    if body["dryRun"] == json!(true) {
        return Json(json!({
            "jobComplete": true,
            "totalBytesProcessed": "2048",
            "schema": schema()
        }))
        .into_response();
    }

    Json(json!({
        "jobReference": { "jobId": "job_1", "projectId": project, "location": "US" },
        "jobComplete": false
    }))
    .into_response()
}

async fn results(
    State(stub): State<Arc<Stub>>,
    Path((project, job)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    stub.record(format!("GET {project}/queries/{job}"), &headers);

    if params.get("pageToken").map(String::as_str) == Some("p2") {
        return Json(json!({
            "jobComplete": true,
            "schema": schema(),
            "totalRows": "3",
            "rows": [row("carol", 3)]
        }));
    }

    if stub.polls.fetch_add(1, Ordering::SeqCst) == 0 {
        return Json(json!({
            "jobReference": { "jobId": job, "projectId": project, "location": "US" },
            "jobComplete": false
        }));
    }

    Json(json!({
        "jobReference": { "jobId": job, "projectId": project, "location": "US" },
        "jobComplete": true,
        "schema": schema(),
        "totalRows": "3",
        "totalBytesProcessed": "4096",
        "rows": [row("alice", 1), row("bob", 2)],
        "pageToken": "p2"
    }))
}

async fn job(
    State(stub): State<Arc<Stub>>,
    Path((project, job)): Path<(String, String)>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    stub.record(format!("GET {project}/jobs/{job}"), &headers);
    Json(json!({
        "jobReference": { "jobId": job, "projectId": project, "location": "US" },
        "statistics": {
            "creationTime": "1700000000000",
            "startTime": "1700000000100",
            "endTime": "1700000001100",
            "totalBytesProcessed": "4096",
            "query": { "billingTier": 1, "cacheHit": false, "statementType": "SELECT" }
        }
    }))
}

async fn datasets(
    State(stub): State<Arc<Stub>>,
    Path(project): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    stub.record(format!("GET {project}/datasets"), &headers);

    match params.get("pageToken").map(String::as_str) {
        None => Json(json!({
            "datasets": [
                { "datasetReference": { "datasetId": "sales", "projectId": project }, "location": "US" }
            ],
            "nextPageToken": "more"
        })),
        Some(_) => Json(json!({
            "datasets": [
                { "datasetReference": { "datasetId": "marketing" }, "location": "EU" }
            ]
        })),
    }
}

async fn start(max_rows: usize) -> (BigQueryClient, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route("/bigquery/v2/projects/:project/queries", post(submit))
        .route("/bigquery/v2/projects/:project/queries/:job", get(results))
        .route("/bigquery/v2/projects/:project/jobs/:job", get(job))
        .route("/bigquery/v2/projects/:project/datasets", get(datasets))
        .with_state(stub.clone());

    let addr = spawn_stub(app).await;
    let settings = WarehouseSettings {
        base_url: format!("http://{addr}/bigquery/v2"),
        max_rows,
        timeout_ms: 1_000,
    };
    (BigQueryClient::new("test-token", settings), stub)
}

#[tokio::test]
async fn test_execute_polls_pages_and_loads_job() {
    let (client, stub) = start(10_000).await;

    let response = client
        .execute_query(&QueryRequest::new("SELECT name, n FROM t", "proj-a"))
        .await
        .unwrap();

    let result = response.result;
    assert_eq!(result.row_count, 3);
    assert_eq!(result.total_rows, Some(3));
    assert!(!result.was_truncated);
    assert_eq!(result.columns[1].data_type, "INTEGER");
    assert_eq!(result.rows[0][0], Value::String("alice".to_string()));
    assert_eq!(result.rows[2][1], Value::Int(3));

    let job = response.job.unwrap();
    assert_eq!(job.job_id.as_deref(), Some("job_1"));
    assert_eq!(job.statement_type.as_deref(), Some("SELECT"));
    assert_eq!(job.total_bytes_processed, Some(4096));
    assert_eq!(job.creation_time, Some(1_700_000_000_000));

    assert_eq!(
        *stub.requests.lock().unwrap(),
        vec![
            "POST proj-a/queries".to_string(),
            "GET proj-a/queries/job_1".to_string(),
            "GET proj-a/queries/job_1".to_string(),
            "GET proj-a/queries/job_1".to_string(),
            "GET proj-a/jobs/job_1".to_string(),
        ]
    );
    assert!(stub
        .auth_headers
        .lock()
        .unwrap()
        .iter()
        .all(|h| h == "Bearer test-token"));
}

#[tokio::test]
async fn test_row_cap_stops_paging_and_marks_truncation() {
    let (client, stub) = start(2).await;

    let response = client
        .execute_query(&QueryRequest::new("SELECT name, n FROM t", "proj-a"))
        .await
        .unwrap();

    assert_eq!(response.result.row_count, 2);
    assert!(response.result.was_truncated);
    assert!(response.result.truncation_warning().is_some());

    let page_fetches = stub
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.starts_with("GET proj-a/queries"))
        .count();
    assert_eq!(page_fetches, 2);
}

#[tokio::test]
async fn test_dry_run_sends_context() {
    let (client, stub) = start(10_000).await;

    let request = QueryRequest {
        default_dataset: Some(DatasetRef::new("sales")),
        location: Some("EU".to_string()),
        ..QueryRequest::new("SELECT * FROM orders", "proj-a")
    };
    let bytes = client.dry_run(&request).await.unwrap();
    assert_eq!(bytes, 2048);

    let body = stub.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["dryRun"], json!(true));
    assert_eq!(body["useLegacySql"], json!(false));
    assert_eq!(body["location"], json!("EU"));
    assert_eq!(
        body["defaultDataset"],
        json!({ "datasetId": "sales", "projectId": "proj-a" })
    );
}

#[tokio::test]
async fn test_list_datasets_follows_page_token() {
    let (client, _stub) = start(10_000).await;

    let datasets = client.list_datasets("proj-a").await.unwrap();

    let ids: Vec<_> = datasets.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["sales", "marketing"]);
    assert_eq!(datasets[1].project_id, "proj-a");
    assert_eq!(datasets[1].location.as_deref(), Some("EU"));
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let (client, _stub) = start(10_000).await;

    let err = client
        .execute_query(&QueryRequest::new("SELECT 1", "denied"))
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Authentication Error");
    assert!(err.to_string().contains("invalid authentication credentials"));
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let (client, _stub) = start(10_000).await;

    let err = client
        .dry_run(&QueryRequest::new("SELECT", "broken"))
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Query Error");
    assert!(err.to_string().contains("Syntax error"));
}
