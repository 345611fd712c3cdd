//! The project document and its query sessions.

use crate::config::DEFAULT_WARN_SIZE_BYTES;
use crate::error::{GiantError, Result};
use crate::warehouse::{DatasetRef, JobInfo, QueryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest session name derived from a query.
pub const SESSION_NAME_MAX_CHARS: usize = 40;

/// One saved query plus its last results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Option<QueryResult>,
    #[serde(default)]
    pub job_info: Option<JobInfo>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    fn new(name: String, query: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            query,
            results: None,
            job_info: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Settings and sessions of one project, saved and loaded wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDocument {
    pub project_id: Option<String>,
    pub warn_size_bytes: u64,
    pub show_query_size_warning: bool,
    pub default_dataset: Option<DatasetRef>,
    pub query_location: Option<String>,
    pub sessions: Vec<Session>,
    pub active_session_id: Option<String>,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            project_id: None,
            warn_size_bytes: DEFAULT_WARN_SIZE_BYTES,
            show_query_size_warning: true,
            default_dataset: None,
            query_location: None,
            sessions: Vec::new(),
            active_session_id: None,
        }
    }
}

impl ProjectDocument {
    /// Creates an empty document for a cloud project.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    /// Overrides the warning threshold.
    pub fn with_warn_size_bytes(mut self, bytes: u64) -> Self {
        self.warn_size_bytes = bytes;
        self
    }

    /// Returns the active session, if any.
    pub fn active_session(&self) -> Option<&Session> {
        let id = self.active_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        let id = self.active_session_id.clone()?;
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Returns a session by id.
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Appends an empty session and makes it active.
    pub fn create_session(&mut self) -> &Session {
        let name = format!("Session {}", self.sessions.len() + 1);
        self.push_active(Session::new(name, String::new()))
    }

    /// Makes the session with `id` active.
    pub fn select_session(&mut self, id: &str) -> Result<()> {
        if self.session(id).is_none() {
            return Err(GiantError::project(format!("Unknown session: {id}")));
        }
        self.active_session_id = Some(id.to_string());
        Ok(())
    }

    /// Removes the session with `id`.
    ///
    /// If it was active, the first remaining session becomes active.
    pub fn delete_session(&mut self, id: &str) -> Result<()> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| GiantError::project(format!("Unknown session: {id}")))?;

        self.sessions.remove(index);

        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = self.sessions.first().map(|s| s.id.clone());
        }
        Ok(())
    }

    /// Stores an execution in the session with `session_id`.
    ///
    /// When that session no longer exists a new one is created, named from
    /// the query. It becomes active only if no other session is.
    pub fn record_execution(
        &mut self,
        session_id: Option<&str>,
        query: &str,
        results: QueryResult,
        job_info: Option<JobInfo>,
    ) -> &Session {
        let index = session_id.and_then(|id| self.sessions.iter().position(|s| s.id == id));

        let index = match index {
            Some(index) => index,
            None => {
                let fallback = format!("Session {}", self.sessions.len() + 1);
                let name = session_name_from_query(query).unwrap_or(fallback);
                let session = Session::new(name, String::new());
                if self.active_session().is_none() {
                    self.push_active(session);
                } else {
                    self.sessions.push(session);
                }
                self.sessions.len() - 1
            }
        };

        let session = &mut self.sessions[index];
        session.query = query.to_string();
        session.results = Some(results);
        session.job_info = job_info;
        session.updated_at = Some(Utc::now());
        session
    }

    fn push_active(&mut self, session: Session) -> &Session {
        self.active_session_id = Some(session.id.clone());
        self.sessions.push(session);
        &self.sessions[self.sessions.len() - 1]
    }
}

/// Derives a session name from the first non-empty line of a query.
fn session_name_from_query(query: &str) -> Option<String> {
    let line = query.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= SESSION_NAME_MAX_CHARS {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(SESSION_NAME_MAX_CHARS - 3).collect();
    Some(format!("{}...", cut.trim_end()))
}
