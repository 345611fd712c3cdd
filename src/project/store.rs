//! Reading and writing project files.
//!
//! Files are written wholesale; concurrent writers overwrite each other.

use super::{ProjectDocument, PROJECT_FILE_EXTENSION};
use crate::error::{GiantError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads a project document from `path`.
pub fn load(path: &Path) -> Result<ProjectDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GiantError::project(format!("Failed to read {}: {e}", path.display()))
    })?;

    let document = serde_json::from_str(&content).map_err(|e| {
        GiantError::project(format!("Invalid project file {}: {e}", path.display()))
    })?;

    debug!(path = %path.display(), "Loaded project");
    Ok(document)
}

/// Saves a project document to `path`, creating parent directories.
pub fn save(path: &Path, document: &ProjectDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            GiantError::project(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    let content = serde_json::to_string_pretty(document)
        .map_err(|e| GiantError::project(format!("Failed to serialize project: {e}")))?;

    std::fs::write(path, content).map_err(|e| {
        GiantError::project(format!("Failed to write {}: {e}", path.display()))
    })?;

    debug!(path = %path.display(), "Saved project");
    Ok(())
}

/// Appends the project extension when `path` has none.
pub fn ensure_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(PROJECT_FILE_EXTENSION)
    }
}
