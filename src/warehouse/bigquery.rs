//! BigQuery REST client implementation.
//!
//! Implements the WarehouseClient trait against the BigQuery v2 REST API
//! using a bearer access token from the OAuth flow.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::types::{
    ColumnInfo, DatasetInfo, DatasetRef, JobInfo, QueryRequest, QueryResponse, QueryResult, Row,
    Value,
};
use super::WarehouseClient;
use crate::auth::{AccessTokenProvider, StaticToken};
use crate::config::WarehouseSettings;
use crate::error::{GiantError, Result};

/// BigQuery REST client. Each request asks its token provider for the
/// bearer token.
#[derive(Clone)]
pub struct BigQueryClient {
    http: Client,
    tokens: Arc<dyn AccessTokenProvider>,
    settings: WarehouseSettings,
}

impl BigQueryClient {
    /// Creates a client for a fixed access token with its own connection pool.
    pub fn new(access_token: impl Into<String>, settings: WarehouseSettings) -> Self {
        Self::with_http(Client::new(), access_token, settings)
    }

    /// Creates a client for a fixed access token sharing a connection pool.
    pub fn with_http(
        http: Client,
        access_token: impl Into<String>,
        settings: WarehouseSettings,
    ) -> Self {
        Self::with_provider(http, Arc::new(StaticToken::new(access_token)), settings)
    }

    /// Creates a client whose token may change between requests.
    pub fn with_provider(
        http: Client,
        tokens: Arc<dyn AccessTokenProvider>,
        settings: WarehouseSettings,
    ) -> Self {
        Self {
            http,
            tokens,
            settings,
        }
    }

    /// Builds `{base_url}/projects/{project}/{rest...}` with each segment escaped.
    fn endpoint(&self, project_id: &str, rest: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.settings.base_url)
            .map_err(|e| GiantError::config(format!("Invalid warehouse base URL: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| GiantError::config("Warehouse base URL cannot have a path"))?;
            segments.pop_if_empty().push("projects").push(project_id);
            segments.extend(rest);
        }
        Ok(url)
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> Result<T> {
        let access_token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GiantError::query(format!("BigQuery request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GiantError::query(format!("Failed to read BigQuery response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| GiantError::query(format!("Unexpected BigQuery response: {e}")))
    }

    /// Turns an error response into a query error, preferring the API's message.
    fn parse_error(status: StatusCode, body: &str) -> GiantError {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error.message);

        match (status, message) {
            (StatusCode::UNAUTHORIZED, Some(message)) => GiantError::auth(message),
            (StatusCode::UNAUTHORIZED, None) => {
                GiantError::auth("BigQuery rejected the access token")
            }
            (_, Some(message)) => GiantError::query(message),
            (_, None) => GiantError::query(format!("BigQuery API error ({status}): {body}")),
        }
    }

    fn query_body(&self, request: &QueryRequest, dry_run: bool) -> serde_json::Value {
        let mut body = json!({
            "query": request.query,
            "useLegacySql": false,
            "dryRun": dry_run,
            "timeoutMs": self.settings.timeout_ms,
            "maxResults": self.settings.max_rows,
        });

        if let Some(location) = &request.location {
            body["location"] = json!(location);
        }

        if let Some(dataset) = &request.default_dataset {
            body["defaultDataset"] = json!(WireDatasetReference::from_ref(
                dataset,
                &request.project_id
            ));
        }

        body
    }

    async fn poll_results(
        &self,
        project_id: &str,
        job: &WireJobReference,
        page_token: Option<&str>,
    ) -> Result<WireQueryResponse> {
        let url = self.endpoint(project_id, &["queries", &job.job_id])?;
        let mut params = vec![
            ("timeoutMs", self.settings.timeout_ms.to_string()),
            ("maxResults", self.settings.max_rows.to_string()),
        ];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        self.send(self.http.get(url).query(&params)).await
    }

    async fn fetch_job(&self, project_id: &str, job: &WireJobReference) -> Result<WireJob> {
        let project_id = job.project_id.as_deref().unwrap_or(project_id);
        let url = self.endpoint(project_id, &["jobs", &job.job_id])?;
        let mut request = self.http.get(url);
        if let Some(location) = &job.location {
            request = request.query(&[("location", location)]);
        }
        self.send(request).await
    }
}

#[async_trait]
impl WarehouseClient for BigQueryClient {
    async fn execute_query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = self.endpoint(&request.project_id, &["queries"])?;
        debug!(project = %request.project_id, "Submitting query");

        let mut page: WireQueryResponse = self
            .send(self.http.post(url).json(&self.query_body(request, false)))
            .await?;

        let job_ref = page
            .job_reference
            .clone()
            .ok_or_else(|| GiantError::query("BigQuery response has no job reference"))?;

        // jobs.query returns early for long queries; wait on getQueryResults
        while !page.job_complete.unwrap_or(false) {
            debug!(job = %job_ref.job_id, "Job still running");
            page = self
                .poll_results(&request.project_id, &job_ref, None)
                .await?;
        }

        let schema = page.schema.clone().unwrap_or_default();
        let total_rows = page.total_rows.as_deref().and_then(|t| t.parse().ok());
        let bytes_processed = page
            .total_bytes_processed
            .as_deref()
            .and_then(|b| b.parse().ok());
        let cache_hit = page.cache_hit;

        let mut rows: Vec<Row> = Vec::new();
        loop {
            rows.extend(
                page.rows
                    .take()
                    .unwrap_or_default()
                    .iter()
                    .map(|row| convert_row(&schema.fields, row)),
            );

            let next = match page.page_token.take() {
                Some(token) if rows.len() < self.settings.max_rows => token,
                _ => break,
            };
            page = self
                .poll_results(&request.project_id, &job_ref, Some(&next))
                .await?;
        }

        let result = build_result(&schema.fields, rows, total_rows, self.settings.max_rows);

        let job = match self.fetch_job(&request.project_id, &job_ref).await {
            Ok(job) => job.into_job_info(),
            Err(e) => {
                warn!(job = %job_ref.job_id, "Could not load job statistics: {e}");
                JobInfo {
                    job_id: Some(job_ref.job_id.clone()),
                    project_id: job_ref.project_id.clone(),
                    location: job_ref.location.clone(),
                    total_bytes_processed: bytes_processed,
                    cache_hit,
                    ..Default::default()
                }
            }
        };

        Ok(QueryResponse {
            result,
            job: Some(job),
        })
    }

    async fn dry_run(&self, request: &QueryRequest) -> Result<u64> {
        let url = self.endpoint(&request.project_id, &["queries"])?;
        let response: WireQueryResponse = self
            .send(self.http.post(url).json(&self.query_body(request, true)))
            .await?;

        Ok(response
            .total_bytes_processed
            .as_deref()
            .and_then(|b| b.parse().ok())
            .unwrap_or(0))
    }

    async fn list_datasets(&self, project_id: &str) -> Result<Vec<DatasetInfo>> {
        let url = self.endpoint(project_id, &["datasets"])?;
        let mut datasets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: WireDatasetList = self.send(request).await?;
            datasets.extend(page.datasets.into_iter().map(|d| DatasetInfo {
                id: d.dataset_reference.dataset_id,
                project_id: d
                    .dataset_reference
                    .project_id
                    .unwrap_or_else(|| project_id.to_string()),
                location: d.location,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(datasets)
    }
}

fn build_result(
    fields: &[WireField],
    mut rows: Vec<Row>,
    total_rows: Option<usize>,
    max_rows: usize,
) -> QueryResult {
    rows.truncate(max_rows);
    let row_count = rows.len();
    let total = total_rows.unwrap_or(row_count);

    QueryResult {
        columns: fields
            .iter()
            .map(|f| {
                let data_type = match f.mode.as_deref() {
                    Some("REPEATED") => format!("ARRAY<{}>", f.field_type),
                    _ => f.field_type.clone(),
                };
                ColumnInfo::new(&f.name, data_type)
            })
            .collect(),
        rows,
        row_count,
        total_rows: Some(total),
        was_truncated: total > row_count,
    }
}

fn convert_row(fields: &[WireField], row: &WireRow) -> Row {
    fields
        .iter()
        .zip(row.f.iter())
        .map(|(field, cell)| convert_cell(field, &cell.v))
        .collect()
}

/// Converts a REST cell to a typed value.
///
/// Scalars arrive as strings; RECORD and REPEATED cells keep their JSON text.
fn convert_cell(field: &WireField, raw: &serde_json::Value) -> Value {
    let text = match raw {
        serde_json::Value::Null => return Value::Null,
        serde_json::Value::String(s) if field.mode.as_deref() != Some("REPEATED") => s,
        other => return Value::String(other.to_string()),
    };

    match field.field_type.as_str() {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::from(text.as_str())),
        "FLOAT" | "FLOAT64" => text
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(text.as_str())),
        "BOOLEAN" | "BOOL" => match text.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::from(text.as_str()),
        },
        "BYTES" => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map(Value::Bytes)
            .unwrap_or_else(|_| Value::from(text.as_str())),
        _ => Value::from(text.as_str()),
    }
}

// Wire types for the REST API. Numeric fields arrive as strings.

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQueryResponse {
    job_reference: Option<WireJobReference>,
    schema: Option<WireSchema>,
    rows: Option<Vec<WireRow>>,
    total_rows: Option<String>,
    page_token: Option<String>,
    job_complete: Option<bool>,
    total_bytes_processed: Option<String>,
    cache_hit: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireJobReference {
    job_id: String,
    project_id: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireSchema {
    #[serde(default)]
    fields: Vec<WireField>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRow {
    #[serde(default)]
    f: Vec<WireCell>,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireJob {
    job_reference: WireJobReference,
    #[serde(default)]
    statistics: WireJobStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireJobStatistics {
    creation_time: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    total_bytes_processed: Option<String>,
    query: Option<WireQueryStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQueryStatistics {
    billing_tier: Option<i64>,
    cache_hit: Option<bool>,
    statement_type: Option<String>,
}

impl WireJob {
    fn into_job_info(self) -> JobInfo {
        let stats = self.statistics;
        let query = stats.query.unwrap_or_default();
        let millis = |v: Option<String>| v.and_then(|s| s.parse().ok());

        JobInfo {
            job_id: Some(self.job_reference.job_id),
            project_id: self.job_reference.project_id,
            location: self.job_reference.location,
            creation_time: millis(stats.creation_time),
            start_time: millis(stats.start_time),
            end_time: millis(stats.end_time),
            total_bytes_processed: stats.total_bytes_processed.and_then(|b| b.parse().ok()),
            billing_tier: query.billing_tier,
            cache_hit: query.cache_hit,
            statement_type: query.statement_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDatasetList {
    #[serde(default)]
    datasets: Vec<WireDataset>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDataset {
    dataset_reference: WireDatasetReference,
    location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDatasetReference {
    dataset_id: String,
    project_id: Option<String>,
}

impl WireDatasetReference {
    fn from_ref(dataset: &DatasetRef, fallback_project: &str) -> Self {
        Self {
            dataset_id: dataset.dataset_id.clone(),
            project_id: Some(
                dataset
                    .project_id
                    .clone()
                    .unwrap_or_else(|| fallback_project.to_string()),
            ),
        }
    }
}
