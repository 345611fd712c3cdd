//! Error types for Giant.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for Giant operations.
#[derive(Error, Debug)]
pub enum GiantError {
    /// OAuth failures (bad state, token endpoint errors, missing client id).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Warehouse API errors (syntax errors, permission denied, HTTP failures).
    #[error("Query error: {0}")]
    Query(String),

    /// Project file errors (unreadable file, invalid JSON, unknown session).
    #[error("Project error: {0}")]
    Project(String),

    /// Configuration errors (invalid config file, missing project id, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The shell or a window went away while a request was in flight.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Internal application errors (terminal setup, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GiantError {
    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a project error with the given message.
    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an IPC error with the given message.
    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::Ipc(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth(_) => "Authentication Error",
            Self::Query(_) => "Query Error",
            Self::Project(_) => "Project Error",
            Self::Config(_) => "Configuration Error",
            Self::Ipc(_) => "IPC Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using GiantError.
pub type Result<T> = std::result::Result<T, GiantError>;
