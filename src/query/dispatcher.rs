//! Query dispatch with the large-query size check.
//!
//! A dispatch estimates the query size, asks for confirmation once when the
//! estimate is above the project's threshold, and only then executes. The
//! outcome is applied to the project document by the caller.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{GiantError, Result};
use crate::project::ProjectDocument;
use crate::shell::ShellHandle;
use crate::warehouse::{DatasetRef, QueryRequest, QueryResponse};

/// Project settings that drive one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub project_id: Option<String>,
    pub warn_size_bytes: u64,
    pub show_query_size_warning: bool,
    pub default_dataset: Option<DatasetRef>,
    pub location: Option<String>,
}

impl From<&ProjectDocument> for DispatchSettings {
    fn from(doc: &ProjectDocument) -> Self {
        Self {
            project_id: doc.project_id.clone(),
            warn_size_bytes: doc.warn_size_bytes,
            show_query_size_warning: doc.show_query_size_warning,
            default_dataset: doc.default_dataset.clone(),
            location: doc.query_location.clone(),
        }
    }
}

impl DispatchSettings {
    fn size_check_enabled(&self) -> bool {
        self.show_query_size_warning && self.warn_size_bytes > 0
    }
}

/// Result of a dispatch that got past validation.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The query ran.
    Executed(QueryOutcome),
    /// The user declined the size warning; nothing ran.
    Declined {
        estimated_bytes: u64,
        disable_warning: bool,
    },
}

impl DispatchOutcome {
    /// Whether the user asked not to see the size warning again.
    pub fn disable_warning(&self) -> bool {
        match self {
            Self::Executed(outcome) => outcome.disable_warning,
            Self::Declined {
                disable_warning, ..
            } => *disable_warning,
        }
    }
}

/// Successful execution outcome.
#[derive(Debug)]
pub struct QueryOutcome {
    pub response: QueryResponse,
    /// Dry-run estimate, when the size check ran.
    pub estimated_bytes: Option<u64>,
    pub disable_warning: bool,
    pub execution_time: Duration,
}

/// Sends queries through the shell, applying the size check first.
#[derive(Clone)]
pub struct QueryDispatcher {
    shell: ShellHandle,
}

impl QueryDispatcher {
    pub fn new(shell: ShellHandle) -> Self {
        Self { shell }
    }

    /// Dispatches `sql` under `settings`.
    pub async fn dispatch(&self, sql: &str, settings: &DispatchSettings) -> Result<DispatchOutcome> {
        if sql.trim().is_empty() {
            return Err(GiantError::query("Query is empty"));
        }

        let project_id = settings
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| GiantError::config("No project id set for this window"))?;

        let request = QueryRequest {
            query: sql.to_string(),
            project_id,
            default_dataset: settings.default_dataset.clone(),
            location: settings.location.clone(),
        };

        let mut estimated_bytes = None;
        let mut disable_warning = false;

        if settings.size_check_enabled() {
            let estimate = self.shell.estimate_query_size(request.clone()).await?;
            debug!(estimate, threshold = settings.warn_size_bytes, "Query size estimated");
            estimated_bytes = Some(estimate);

            if estimate > settings.warn_size_bytes {
                let decision = self
                    .shell
                    .confirm_large_query(estimate, settings.warn_size_bytes)
                    .await?;
                disable_warning = decision.dont_show_again;

                if !decision.confirmed {
                    info!(estimate, "Large query declined");
                    return Ok(DispatchOutcome::Declined {
                        estimated_bytes: estimate,
                        disable_warning,
                    });
                }
            }
        }

        let start = Instant::now();
        let response = self.shell.execute_query(request).await?;

        Ok(DispatchOutcome::Executed(QueryOutcome {
            response,
            estimated_bytes,
            disable_warning,
            execution_time: start.elapsed(),
        }))
    }
}

/// Applies a dispatch outcome to the project document.
///
/// Turns the size warning off when asked to, and records an executed query
/// in `session`, the session it was run from. Returns the id of the session
/// that received the results.
pub fn apply_outcome(
    document: &mut ProjectDocument,
    session: Option<&str>,
    sql: &str,
    outcome: &DispatchOutcome,
) -> Option<String> {
    if outcome.disable_warning() {
        document.show_query_size_warning = false;
    }

    match outcome {
        DispatchOutcome::Executed(executed) => {
            let recorded = document.record_execution(
                session,
                sql,
                executed.response.result.clone(),
                executed.response.job.clone(),
            );
            Some(recorded.id.clone())
        }
        DispatchOutcome::Declined { .. } => None,
    }
}
