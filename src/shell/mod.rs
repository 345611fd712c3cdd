//! The shell: owner of windows, the warehouse client and native dialogs.
//!
//! Windows never touch the warehouse or the filesystem directly. They send a
//! [`ShellRequest`] through a [`ShellHandle`] and receive exactly one reply on
//! a oneshot channel. Warehouse calls and dialogs run in spawned tasks so the
//! shell keeps serving other windows while they are in flight.

mod dialogs;
mod windows;

pub use dialogs::{ConfirmDecision, Dialogs, ScriptedDialogs};
pub use windows::{OpenOutcome, ProjectBinding, WindowId, WindowRegistry};

use crate::config::ProjectSettings;
use crate::error::{GiantError, Result};
use crate::project::{self, ProjectDocument};
use crate::warehouse::{DatasetInfo, QueryRequest, QueryResponse, WarehouseClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

const SAVE_CANCELLED: &str = "Save cancelled";

/// Result of a save or open, reported as a flag plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIoOutcome {
    pub success: bool,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl ProjectIoOutcome {
    fn ok(message: impl Into<String>, path: PathBuf) -> Self {
        Self {
            success: true,
            message: message.into(),
            path: Some(path),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            path: None,
        }
    }

    /// Whether the user dismissed the save dialog.
    pub fn is_cancelled(&self) -> bool {
        !self.success && self.message == SAVE_CANCELLED
    }
}

/// What to open in a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// Ask the user for a project file.
    Dialog,
    File(PathBuf),
    ProjectId(String),
}

/// Reply to an open request.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenProjectOutcome {
    /// A new window was created for the project.
    Opened {
        window: WindowId,
        document: ProjectDocument,
        path: Option<PathBuf>,
    },
    /// The project was already open; that window now has focus.
    Focused { window: WindowId },
    Cancelled,
    Failed { message: String },
}

/// Requests a window can send to the shell.
#[derive(Debug)]
pub enum ShellRequest {
    ExecuteQuery {
        request: QueryRequest,
        reply: oneshot::Sender<Result<QueryResponse>>,
    },
    EstimateQuerySize {
        request: QueryRequest,
        reply: oneshot::Sender<Result<u64>>,
    },
    ConfirmLargeQuery {
        estimated_bytes: u64,
        threshold_bytes: u64,
        reply: oneshot::Sender<ConfirmDecision>,
    },
    ListDatasets {
        project_id: String,
        reply: oneshot::Sender<Result<Vec<DatasetInfo>>>,
    },
    SaveProject {
        window: WindowId,
        document: ProjectDocument,
        save_as: bool,
        reply: oneshot::Sender<ProjectIoOutcome>,
    },
    OpenProject {
        target: OpenTarget,
        reply: oneshot::Sender<OpenProjectOutcome>,
    },
    CreateProject {
        project_id: Option<String>,
        reply: oneshot::Sender<(WindowId, ProjectDocument)>,
    },
    GetCurrentProjectId {
        window: WindowId,
        reply: oneshot::Sender<Option<String>>,
    },
    SetCurrentProjectId {
        window: WindowId,
        project_id: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    CloseWindow {
        window: WindowId,
        reply: oneshot::Sender<Option<WindowId>>,
    },
    FocusWindow {
        window: WindowId,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Work that resumes in the actor once a dialog has answered.
enum Followup {
    Save {
        window: WindowId,
        document: ProjectDocument,
        path: PathBuf,
        reply: oneshot::Sender<ProjectIoOutcome>,
    },
    Open {
        path: PathBuf,
        reply: oneshot::Sender<OpenProjectOutcome>,
    },
}

/// The shell actor.
pub struct Shell {
    receiver: mpsc::Receiver<ShellRequest>,
    followups: mpsc::Receiver<Followup>,
    followup_sender: mpsc::Sender<Followup>,
    client: Arc<dyn WarehouseClient>,
    dialogs: Arc<dyn Dialogs>,
    defaults: ProjectSettings,
    registry: WindowRegistry,
}

impl Shell {
    /// Creates the actor and returns a handle for communication.
    ///
    /// The caller drives the actor with `tokio::spawn(shell.run())`.
    pub fn spawn(
        client: Arc<dyn WarehouseClient>,
        dialogs: Arc<dyn Dialogs>,
        defaults: ProjectSettings,
    ) -> (ShellHandle, Self) {
        let (sender, receiver) = mpsc::channel(32);
        let (followup_sender, followups) = mpsc::channel(32);

        let shell = Self {
            receiver,
            followups,
            followup_sender,
            client,
            dialogs,
            defaults,
            registry: WindowRegistry::new(),
        };

        (ShellHandle { sender }, shell)
    }

    /// Runs the actor loop until Shutdown is received or every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.receiver.recv() => match request {
                    Some(ShellRequest::Shutdown) | None => break,
                    Some(request) => self.handle(request),
                },
                Some(followup) = self.followups.recv() => self.resume(followup),
            }
        }
        debug!("Shell stopped");
    }

    fn handle(&mut self, request: ShellRequest) {
        match request {
            ShellRequest::ExecuteQuery { request, reply } => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    let result = client.execute_query(&request).await;
                    if let Err(e) = &result {
                        error!(project = %request.project_id, "Query failed: {e}");
                    }
                    let _ = reply.send(result);
                });
            }
            ShellRequest::EstimateQuerySize { request, reply } => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    let result = client.dry_run(&request).await;
                    if let Err(e) = &result {
                        error!(project = %request.project_id, "Dry run failed: {e}");
                    }
                    let _ = reply.send(result);
                });
            }
            ShellRequest::ConfirmLargeQuery {
                estimated_bytes,
                threshold_bytes,
                reply,
            } => {
                let dialogs = self.dialogs.clone();
                tokio::spawn(async move {
                    let decision = dialogs
                        .confirm_large_query(estimated_bytes, threshold_bytes)
                        .await;
                    let _ = reply.send(decision);
                });
            }
            ShellRequest::ListDatasets { project_id, reply } => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    let result = client.list_datasets(&project_id).await;
                    if let Err(e) = &result {
                        error!(project = %project_id, "Listing datasets failed: {e}");
                    }
                    let _ = reply.send(result);
                });
            }
            ShellRequest::SaveProject {
                window,
                document,
                save_as,
                reply,
            } => self.save_project(window, document, save_as, reply),
            ShellRequest::OpenProject { target, reply } => self.open_project(target, reply),
            ShellRequest::CreateProject { project_id, reply } => {
                let _ = reply.send(self.create_project(project_id));
            }
            ShellRequest::GetCurrentProjectId { window, reply } => {
                let _ = reply.send(self.registry.project_id(window).map(String::from));
            }
            ShellRequest::SetCurrentProjectId {
                window,
                project_id,
                reply,
            } => {
                let _ = reply.send(self.registry.set_project_id(window, project_id));
            }
            ShellRequest::CloseWindow { window, reply } => {
                self.registry.close(window);
                let _ = reply.send(self.registry.focused());
            }
            ShellRequest::FocusWindow { window, reply } => {
                let _ = reply.send(self.registry.focus(window));
            }
            ShellRequest::Shutdown => {}
        }
    }

    fn new_document(&self, project_id: Option<String>) -> ProjectDocument {
        ProjectDocument {
            project_id: project_id.or_else(|| self.defaults.default_project_id.clone()),
            ..ProjectDocument::default()
        }
        .with_warn_size_bytes(self.defaults.warn_size_bytes)
    }

    fn create_project(&mut self, project_id: Option<String>) -> (WindowId, ProjectDocument) {
        let document = self.new_document(project_id);
        let window = self.registry.create_unbound();
        self.registry
            .set_project_id(window, document.project_id.clone());
        info!(%window, "Created project window");
        (window, document)
    }

    fn resume(&mut self, followup: Followup) {
        match followup {
            Followup::Save {
                window,
                document,
                path,
                reply,
            } => {
                let _ = reply.send(self.write_project(window, &document, path));
            }
            Followup::Open { path, reply } => {
                let _ = reply.send(self.open_binding(ProjectBinding::file(path)));
            }
        }
    }

    fn save_project(
        &mut self,
        window: WindowId,
        document: ProjectDocument,
        save_as: bool,
        reply: oneshot::Sender<ProjectIoOutcome>,
    ) {
        let known = self
            .registry
            .binding(window)
            .and_then(|b| b.path())
            .map(PathBuf::from);

        let suggested = match (known, save_as) {
            (Some(path), false) => {
                let _ = reply.send(self.write_project(window, &document, path));
                return;
            }
            (known, _) => known,
        };

        let dialogs = self.dialogs.clone();
        let followups = self.followup_sender.clone();
        tokio::spawn(async move {
            let Some(path) = dialogs.pick_save_path(suggested).await else {
                let _ = reply.send(ProjectIoOutcome::failed(SAVE_CANCELLED));
                return;
            };
            let path = project::ensure_extension(path);
            let followup = Followup::Save {
                window,
                document,
                path,
                reply,
            };
            if followups.send(followup).await.is_err() {
                warn!(%window, "Shell stopped before the save was written");
            }
        });
    }

    fn write_project(
        &mut self,
        window: WindowId,
        document: &ProjectDocument,
        path: PathBuf,
    ) -> ProjectIoOutcome {
        match project::save(&path, document) {
            Ok(()) => {
                self.registry.bind_file(window, &path);
                self.registry
                    .set_project_id(window, document.project_id.clone());
                info!(path = %path.display(), "Project saved");
                ProjectIoOutcome::ok(format!("Saved to {}", path.display()), path)
            }
            Err(e) => {
                error!(path = %path.display(), "Save failed: {e}");
                ProjectIoOutcome::failed(e.to_string())
            }
        }
    }

    fn open_project(&mut self, target: OpenTarget, reply: oneshot::Sender<OpenProjectOutcome>) {
        let binding = match target {
            OpenTarget::File(path) => ProjectBinding::file(path),
            OpenTarget::ProjectId(id) => ProjectBinding::ProjectId(id),
            OpenTarget::Dialog => {
                let dialogs = self.dialogs.clone();
                let followups = self.followup_sender.clone();
                tokio::spawn(async move {
                    let Some(path) = dialogs.pick_open_path().await else {
                        let _ = reply.send(OpenProjectOutcome::Cancelled);
                        return;
                    };
                    if followups.send(Followup::Open { path, reply }).await.is_err() {
                        warn!("Shell stopped before the project was opened");
                    }
                });
                return;
            }
        };
        let _ = reply.send(self.open_binding(binding));
    }

    fn open_binding(&mut self, binding: ProjectBinding) -> OpenProjectOutcome {
        if let Some(window) = self.registry.find(&binding) {
            self.registry.focus(window);
            debug!(%window, "Project already open, focusing");
            return OpenProjectOutcome::Focused { window };
        }

        let (document, path) = match &binding {
            ProjectBinding::File(path) => match project::load(path) {
                Ok(document) => (document, Some(path.clone())),
                Err(e) => {
                    warn!(path = %path.display(), "Open failed: {e}");
                    return OpenProjectOutcome::Failed {
                        message: e.to_string(),
                    };
                }
            },
            ProjectBinding::ProjectId(id) => (self.new_document(Some(id.clone())), None),
            ProjectBinding::Unbound => (self.new_document(None), None),
        };

        let window = self.registry.open(binding).window();
        self.registry
            .set_project_id(window, document.project_id.clone());
        info!(%window, "Opened project window");

        OpenProjectOutcome::Opened {
            window,
            document,
            path,
        }
    }
}

/// Handle for communicating with the shell actor.
///
/// Cheap to clone; every method sends one request and awaits its reply.
#[derive(Clone)]
pub struct ShellHandle {
    sender: mpsc::Sender<ShellRequest>,
}

impl ShellHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ShellRequest,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| GiantError::ipc("Shell closed"))?;
        response
            .await
            .map_err(|_| GiantError::ipc("Shell dropped the request"))
    }

    pub async fn execute_query(&self, request: QueryRequest) -> Result<QueryResponse> {
        self.call(|reply| ShellRequest::ExecuteQuery { request, reply })
            .await?
    }

    pub async fn estimate_query_size(&self, request: QueryRequest) -> Result<u64> {
        self.call(|reply| ShellRequest::EstimateQuerySize { request, reply })
            .await?
    }

    pub async fn confirm_large_query(
        &self,
        estimated_bytes: u64,
        threshold_bytes: u64,
    ) -> Result<ConfirmDecision> {
        self.call(|reply| ShellRequest::ConfirmLargeQuery {
            estimated_bytes,
            threshold_bytes,
            reply,
        })
        .await
    }

    pub async fn list_datasets(&self, project_id: impl Into<String>) -> Result<Vec<DatasetInfo>> {
        let project_id = project_id.into();
        self.call(|reply| ShellRequest::ListDatasets { project_id, reply })
            .await?
    }

    pub async fn save_project(
        &self,
        window: WindowId,
        document: ProjectDocument,
        save_as: bool,
    ) -> Result<ProjectIoOutcome> {
        self.call(|reply| ShellRequest::SaveProject {
            window,
            document,
            save_as,
            reply,
        })
        .await
    }

    pub async fn open_project(&self, target: OpenTarget) -> Result<OpenProjectOutcome> {
        self.call(|reply| ShellRequest::OpenProject { target, reply })
            .await
    }

    pub async fn create_project(
        &self,
        project_id: Option<String>,
    ) -> Result<(WindowId, ProjectDocument)> {
        self.call(|reply| ShellRequest::CreateProject { project_id, reply })
            .await
    }

    pub async fn current_project_id(&self, window: WindowId) -> Result<Option<String>> {
        self.call(|reply| ShellRequest::GetCurrentProjectId { window, reply })
            .await
    }

    pub async fn set_current_project_id(
        &self,
        window: WindowId,
        project_id: Option<String>,
    ) -> Result<bool> {
        self.call(|reply| ShellRequest::SetCurrentProjectId {
            window,
            project_id,
            reply,
        })
        .await
    }

    /// Closes a window and returns the window focused afterwards.
    pub async fn close_window(&self, window: WindowId) -> Result<Option<WindowId>> {
        self.call(|reply| ShellRequest::CloseWindow { window, reply })
            .await
    }

    pub async fn focus_window(&self, window: WindowId) -> Result<bool> {
        self.call(|reply| ShellRequest::FocusWindow { window, reply })
            .await
    }

    /// Stops the shell actor.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ShellRequest::Shutdown)
            .await
            .map_err(|_| GiantError::ipc("Shell closed"))
    }
}
