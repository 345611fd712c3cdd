//! Command-line argument parsing for Giant.
//!
//! The desktop client takes a single optional startup argument: a cloud
//! project id or the path of a project file to open at launch.

use crate::error::{GiantError, Result};
use crate::project::PROJECT_FILE_EXTENSION;
use clap::Parser;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Google Cloud project id, optionally domain-scoped (`example.com:my-project`).
static PROJECT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z][a-z0-9.\-]*[a-z0-9]:)?[a-z][a-z0-9\-]{4,28}[a-z0-9]$")
        .expect("project id pattern is valid")
});

/// What to open in the first window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// A cloud project id, opened in a fresh unsaved project.
    ProjectId(String),
    /// A saved project file.
    ProjectFile(PathBuf),
}

/// A desktop client for running SQL against BigQuery.
#[derive(Parser, Debug)]
#[command(name = "giant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cloud project id or path to a .giant project file
    #[arg(value_name = "PROJECT")]
    pub target: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use an in-memory warehouse instead of BigQuery
    #[arg(long)]
    pub mock: bool,

    /// Run the HTTP backend instead of the desktop UI
    #[arg(long)]
    pub serve: bool,

    /// Port for the HTTP backend
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Resolves the positional argument into a launch target.
    ///
    /// Existing files and paths with the project extension are project files;
    /// anything else must look like a project id.
    pub fn launch_target(&self) -> Result<Option<LaunchTarget>> {
        match self.target.as_deref() {
            None => Ok(None),
            Some(raw) => resolve_target(raw).map(Some),
        }
    }
}

fn resolve_target(raw: &str) -> Result<LaunchTarget> {
    let path = Path::new(raw);
    let has_project_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_FILE_EXTENSION));

    if path.is_file() || has_project_extension {
        return Ok(LaunchTarget::ProjectFile(path.to_path_buf()));
    }

    if is_valid_project_id(raw) {
        return Ok(LaunchTarget::ProjectId(raw.to_string()));
    }

    Err(GiantError::config(format!(
        "'{raw}' is neither a project file nor a valid project id"
    )))
}

/// Returns true if `candidate` looks like a Google Cloud project id.
pub fn is_valid_project_id(candidate: &str) -> bool {
    PROJECT_ID_RE.is_match(candidate)
}
