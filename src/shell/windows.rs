//! Window registry: which project each open window is bound to.
//!
//! Bindings live only as long as the window and are never persisted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Generates a new unique window ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a window was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectBinding {
    /// A new project that has not been saved yet.
    Unbound,
    /// A cloud project id without a file.
    ProjectId(String),
    /// A saved project file.
    File(PathBuf),
}

impl ProjectBinding {
    /// Builds a file binding, canonicalizing the path when it exists.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(normalize_path(path.as_ref()))
    }

    /// Returns the bound file path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            _ => None,
        }
    }
}

/// Result of asking the registry to open a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A new window was created and focused.
    Created(WindowId),
    /// A window already held the binding and was focused instead.
    Focused(WindowId),
}

impl OpenOutcome {
    pub fn window(&self) -> WindowId {
        match self {
            Self::Created(id) | Self::Focused(id) => *id,
        }
    }
}

#[derive(Debug)]
struct WindowEntry {
    id: WindowId,
    binding: ProjectBinding,
    project_id: Option<String>,
}

/// Tracks open windows in the order they were opened.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: Vec<WindowEntry>,
    focused: Option<WindowId>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a window for `binding`, or focuses the one already bound to it.
    ///
    /// Unbound requests always create a window.
    pub fn open(&mut self, binding: ProjectBinding) -> OpenOutcome {
        let binding = match binding {
            ProjectBinding::File(path) => ProjectBinding::file(path),
            other => other,
        };

        if binding != ProjectBinding::Unbound {
            if let Some(id) = self.find(&binding) {
                self.focused = Some(id);
                return OpenOutcome::Focused(id);
            }
        }

        let project_id = match &binding {
            ProjectBinding::ProjectId(id) => Some(id.clone()),
            _ => None,
        };
        let id = WindowId::new();
        self.windows.push(WindowEntry {
            id,
            binding,
            project_id,
        });
        self.focused = Some(id);
        OpenOutcome::Created(id)
    }

    /// Creates an unbound window and focuses it.
    pub fn create_unbound(&mut self) -> WindowId {
        self.open(ProjectBinding::Unbound).window()
    }

    /// Returns the window bound to `binding`, if any.
    pub fn find(&self, binding: &ProjectBinding) -> Option<WindowId> {
        let binding = match binding {
            ProjectBinding::File(path) => ProjectBinding::file(path),
            other => other.clone(),
        };
        self.windows
            .iter()
            .find(|w| w.binding == binding)
            .map(|w| w.id)
    }

    /// Closes a window and drops its binding.
    ///
    /// Closing the focused window focuses the most recently opened remaining
    /// one. Returns false for unknown windows.
    pub fn close(&mut self, id: WindowId) -> bool {
        let Some(index) = self.windows.iter().position(|w| w.id == id) else {
            return false;
        };
        self.windows.remove(index);

        if self.focused == Some(id) {
            self.focused = self.windows.last().map(|w| w.id);
        }
        true
    }

    /// Focuses a window. Returns false for unknown windows.
    pub fn focus(&mut self, id: WindowId) -> bool {
        if self.contains(id) {
            self.focused = Some(id);
            true
        } else {
            false
        }
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.iter().any(|w| w.id == id)
    }

    pub fn binding(&self, id: WindowId) -> Option<&ProjectBinding> {
        self.entry(id).map(|w| &w.binding)
    }

    /// Rebinds a window to the file it was saved under.
    pub fn bind_file(&mut self, id: WindowId, path: &Path) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.binding = ProjectBinding::file(path);
                true
            }
            None => false,
        }
    }

    /// Returns the cloud project id the window currently targets.
    pub fn project_id(&self, id: WindowId) -> Option<&str> {
        self.entry(id).and_then(|w| w.project_id.as_deref())
    }

    /// Sets the cloud project id the window targets.
    ///
    /// A window opened for a project id follows the change, so it is found
    /// under the new id and no longer under the old one.
    pub fn set_project_id(&mut self, id: WindowId, project_id: Option<String>) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        if let ProjectBinding::ProjectId(_) = entry.binding {
            entry.binding = match &project_id {
                Some(project) => ProjectBinding::ProjectId(project.clone()),
                None => ProjectBinding::Unbound,
            };
        }
        entry.project_id = project_id;
        true
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn entry(&self, id: WindowId) -> Option<&WindowEntry> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn entry_mut(&mut self, id: WindowId) -> Option<&mut WindowEntry> {
        self.windows.iter_mut().find(|w| w.id == id)
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
