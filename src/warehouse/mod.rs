//! Warehouse abstraction layer for Giant.
//!
//! Provides a trait-based interface over the managed query service so the
//! BigQuery REST client and the in-memory mock can be used interchangeably.
//! Nothing here adds retry, backoff or rate limiting on top of the service.

mod bigquery;
mod mock;
mod types;

pub use bigquery::BigQueryClient;
pub use mock::{MockCall, MockWarehouseClient};
pub use types::{
    format_bytes, ColumnInfo, DatasetInfo, DatasetRef, JobInfo, QueryRequest, QueryResponse,
    QueryResult, Row, Value,
};

use crate::config::WarehouseSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait defining the interface for warehouse clients.
///
/// All operations are async and return Results with GiantError.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Executes a query and returns its rows and job metadata.
    async fn execute_query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// Estimates the bytes a query would process without running it.
    async fn dry_run(&self, request: &QueryRequest) -> Result<u64>;

    /// Lists the datasets of a project.
    async fn list_datasets(&self, project_id: &str) -> Result<Vec<DatasetInfo>>;
}

/// Builds warehouse clients for a caller-supplied access token.
///
/// The HTTP backend receives a token with every request and needs a client
/// bound to it.
pub trait WarehouseFactory: Send + Sync {
    fn connect(&self, access_token: &str) -> Arc<dyn WarehouseClient>;
}

/// Factory producing [`BigQueryClient`]s that share one HTTP connection pool.
pub struct BigQueryFactory {
    http: reqwest::Client,
    settings: WarehouseSettings,
}

impl BigQueryFactory {
    pub fn new(settings: WarehouseSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

impl WarehouseFactory for BigQueryFactory {
    fn connect(&self, access_token: &str) -> Arc<dyn WarehouseClient> {
        Arc::new(BigQueryClient::with_http(
            self.http.clone(),
            access_token,
            self.settings.clone(),
        ))
    }
}

/// Factory that hands out the same mock client for every token.
pub struct MockWarehouseFactory {
    client: Arc<MockWarehouseClient>,
}

impl MockWarehouseFactory {
    pub fn new(client: Arc<MockWarehouseClient>) -> Self {
        Self { client }
    }
}

impl WarehouseFactory for MockWarehouseFactory {
    fn connect(&self, _access_token: &str) -> Arc<dyn WarehouseClient> {
        self.client.clone()
    }
}
