//! Mock warehouse client for testing.
//!
//! Provides an in-memory warehouse that records every call so tests and the
//! `--mock` launch mode can run without Google credentials.

use super::{
    ColumnInfo, DatasetInfo, JobInfo, QueryRequest, QueryResponse, QueryResult, Value,
    WarehouseClient,
};
use crate::error::{GiantError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A call received by the mock client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Execute(QueryRequest),
    DryRun(QueryRequest),
    ListDatasets(String),
}

/// A mock warehouse client that returns predefined results.
pub struct MockWarehouseClient {
    dry_run_bytes: AtomicU64,
    datasets: Vec<DatasetInfo>,
    failure: Option<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockWarehouseClient {
    /// Creates a mock that estimates every query at zero bytes.
    pub fn new() -> Self {
        Self {
            dry_run_bytes: AtomicU64::new(0),
            datasets: Vec::new(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the estimate returned by dry runs.
    pub fn with_dry_run_bytes(self, bytes: u64) -> Self {
        self.dry_run_bytes.store(bytes, Ordering::Relaxed);
        self
    }

    /// Sets the datasets returned for every project.
    pub fn with_datasets(mut self, datasets: Vec<DatasetInfo>) -> Self {
        self.datasets = datasets;
        self
    }

    /// Makes every operation fail with a query error carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Changes the dry-run estimate after construction.
    pub fn set_dry_run_bytes(&self, bytes: u64) {
        self.dry_run_bytes.store(bytes, Ordering::Relaxed);
    }

    /// Returns every call received so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Returns the requests that were executed (not dry runs).
    pub fn executed_queries(&self) -> Vec<QueryRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Execute(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Returns how many dry runs were requested.
    pub fn dry_run_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::DryRun(_)))
            .count()
    }

    fn record(&self, call: MockCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.failure {
            Some(message) => Err(GiantError::query(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockWarehouseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WarehouseClient for MockWarehouseClient {
    async fn execute_query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        self.record(MockCall::Execute(request.clone()))?;

        let job_number = self.executed_queries().len();
        let job = JobInfo {
            job_id: Some(format!("mock_job_{job_number}")),
            project_id: Some(request.project_id.clone()),
            location: Some(request.location.clone().unwrap_or_else(|| "US".to_string())),
            total_bytes_processed: Some(self.dry_run_bytes.load(Ordering::Relaxed)),
            billing_tier: Some(1),
            cache_hit: Some(false),
            statement_type: request
                .query
                .split_whitespace()
                .next()
                .map(|word| word.to_uppercase()),
            ..Default::default()
        };

        let result = if request.query.trim_start().to_uppercase().starts_with("SELECT") {
            QueryResult::with_data(
                vec![ColumnInfo::new("result", "STRING")],
                vec![vec![Value::String(format!(
                    "Mock result for: {}",
                    request.query
                ))]],
            )
        } else {
            QueryResult::with_data(vec![], vec![])
        };

        Ok(QueryResponse {
            result,
            job: Some(job),
        })
    }

    async fn dry_run(&self, request: &QueryRequest) -> Result<u64> {
        self.record(MockCall::DryRun(request.clone()))?;
        Ok(self.dry_run_bytes.load(Ordering::Relaxed))
    }

    async fn list_datasets(&self, project_id: &str) -> Result<Vec<DatasetInfo>> {
        self.record(MockCall::ListDatasets(project_id.to_string()))?;
        Ok(self.datasets.clone())
    }
}
