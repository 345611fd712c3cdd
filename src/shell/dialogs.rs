//! Native dialogs the shell can show on behalf of a window.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

/// Answer from the large-query confirmation dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmDecision {
    pub confirmed: bool,
    pub dont_show_again: bool,
}

impl ConfirmDecision {
    pub fn confirm() -> Self {
        Self {
            confirmed: true,
            dont_show_again: false,
        }
    }

    pub fn decline() -> Self {
        Self::default()
    }

    pub fn and_dont_show_again(mut self) -> Self {
        self.dont_show_again = true;
        self
    }
}

/// Dialogs presented by the front end.
#[async_trait]
pub trait Dialogs: Send + Sync {
    /// Asks whether to run a query estimated above the warning threshold.
    async fn confirm_large_query(&self, estimated_bytes: u64, threshold_bytes: u64)
        -> ConfirmDecision;

    /// Asks where to save a project. `None` means cancelled.
    async fn pick_save_path(&self, suggested: Option<PathBuf>) -> Option<PathBuf>;

    /// Asks which project file to open. `None` means cancelled.
    async fn pick_open_path(&self) -> Option<PathBuf>;
}

/// Dialogs that replay scripted answers. Used by tests and headless runs.
///
/// Once a script runs out, confirmations decline and path pickers cancel.
#[derive(Debug, Default)]
pub struct ScriptedDialogs {
    confirms: Mutex<VecDeque<ConfirmDecision>>,
    save_paths: Mutex<VecDeque<PathBuf>>,
    open_paths: Mutex<VecDeque<PathBuf>>,
    confirm_requests: Mutex<Vec<(u64, u64)>>,
}

impl ScriptedDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm(self, decision: ConfirmDecision) -> Self {
        if let Ok(mut q) = self.confirms.lock() {
            q.push_back(decision);
        }
        self
    }

    pub fn with_save_path(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut q) = self.save_paths.lock() {
            q.push_back(path.into());
        }
        self
    }

    pub fn with_open_path(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut q) = self.open_paths.lock() {
            q.push_back(path.into());
        }
        self
    }

    /// Returns the `(estimated, threshold)` pairs of every confirmation shown.
    pub fn confirm_requests(&self) -> Vec<(u64, u64)> {
        self.confirm_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Dialogs for ScriptedDialogs {
    async fn confirm_large_query(
        &self,
        estimated_bytes: u64,
        threshold_bytes: u64,
    ) -> ConfirmDecision {
        if let Ok(mut r) = self.confirm_requests.lock() {
            r.push((estimated_bytes, threshold_bytes));
        }
        self.confirms
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_default()
    }

    async fn pick_save_path(&self, _suggested: Option<PathBuf>) -> Option<PathBuf> {
        self.save_paths.lock().ok().and_then(|mut q| q.pop_front())
    }

    async fn pick_open_path(&self) -> Option<PathBuf> {
        self.open_paths.lock().ok().and_then(|mut q| q.pop_front())
    }
}
