//! Configuration management for Giant.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! Values from the file win; environment variables only fill what the file
//! leaves unset.

use crate::error::{GiantError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default query-size warning threshold (1 GiB).
pub const DEFAULT_WARN_SIZE_BYTES: u64 = 1_073_741_824;

/// Google OAuth 2.0 endpoints.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

/// BigQuery REST API root.
pub const BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Main configuration structure for Giant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OAuth client settings.
    #[serde(default)]
    pub oauth: OAuthSettings,

    /// Defaults applied to new projects.
    #[serde(default)]
    pub project: ProjectSettings,

    /// HTTP backend settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Warehouse API settings.
    #[serde(default)]
    pub warehouse: WarehouseSettings,
}

/// OAuth client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    /// Client secret (prefer GOOGLE_CLIENT_SECRET over storing it here).
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl OAuthSettings {
    /// Redirect URI used when none is configured.
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://127.0.0.1:8085/oauth-callback";

    /// Returns the configured redirect URI or the loopback default.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri
            .as_deref()
            .unwrap_or(Self::DEFAULT_REDIRECT_URI)
    }
}

/// Project defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Cloud project used when a window has no project of its own.
    pub default_project_id: Option<String>,

    /// Warning threshold for new projects, in bytes.
    #[serde(default = "default_warn_size_bytes")]
    pub warn_size_bytes: u64,
}

fn default_warn_size_bytes() -> u64 {
    DEFAULT_WARN_SIZE_BYTES
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            default_project_id: None,
            warn_size_bytes: default_warn_size_bytes(),
        }
    }
}

/// HTTP backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Warehouse API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseSettings {
    /// REST API root; overridden in tests to point at a local stub.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum number of rows fetched for one query.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Server-side wait per request before the job is polled again.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    BIGQUERY_BASE_URL.to_string()
}

fn default_max_rows() -> usize {
    10_000
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_rows: default_max_rows(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("giant")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GiantError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GiantError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies process environment variables as defaults.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies environment defaults read through `lookup`.
    ///
    /// Recognized variables: GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET,
    /// REDIRECT_URI, GOOGLE_CLOUD_PROJECT and PORT.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.oauth.client_id.is_none() {
            self.oauth.client_id = non_empty("GOOGLE_CLIENT_ID");
        }
        if self.oauth.client_secret.is_none() {
            self.oauth.client_secret = non_empty("GOOGLE_CLIENT_SECRET");
        }
        if self.oauth.redirect_uri.is_none() {
            self.oauth.redirect_uri = non_empty("REDIRECT_URI");
        }
        if self.project.default_project_id.is_none() {
            self.project.default_project_id = non_empty("GOOGLE_CLOUD_PROJECT");
        }
        if self.server.port == default_port() {
            if let Some(port) = non_empty("PORT").and_then(|p| p.parse().ok()) {
                self.server.port = port;
            }
        }
    }
}
