//! Terminal User Interface for Giant.
//!
//! Runs the event loop with ratatui and crossterm. Every shell call runs in a
//! spawned task that reports back as a [`UiMessage`], so the loop keeps
//! drawing while queries, saves and dialogs are in flight.

pub mod app;
mod dialogs;
pub mod editor;
mod events;
pub mod pagination;
pub mod settings;
mod ui;
pub mod widgets;
pub mod window;

pub use app::{Action, App};
pub use dialogs::{DialogRequest, TuiDialogs};
pub use events::{command_for, Command, Event};

use crate::error::{GiantError, Result};
use crate::project::ProjectDocument;
use crate::query::{DispatchOutcome, QueryDispatcher};
use crate::shell::{OpenProjectOutcome, OpenTarget, ProjectIoOutcome, ShellHandle, WindowId};
use crate::warehouse::DatasetInfo;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Messages sent from background tasks to the main loop.
#[derive(Debug)]
pub enum UiMessage {
    Dispatched {
        window: WindowId,
        session: Option<String>,
        sql: String,
        result: Result<DispatchOutcome>,
    },
    Saved {
        window: WindowId,
        result: Result<ProjectIoOutcome>,
    },
    Opened(Result<OpenProjectOutcome>),
    Created(Result<(WindowId, ProjectDocument)>),
    Datasets {
        window: WindowId,
        result: Result<Vec<DatasetInfo>>,
    },
    ProjectIdSet {
        window: WindowId,
        result: Result<bool>,
    },
    Closed {
        window: WindowId,
        result: Result<Option<WindowId>>,
    },
    Dialog(DialogRequest),
}

/// Creates the channel background tasks and [`TuiDialogs`] report on.
pub fn channel() -> (mpsc::Sender<UiMessage>, mpsc::Receiver<UiMessage>) {
    mpsc::channel(32)
}

/// The main TUI application runner.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Creates a new TUI instance, initializing the terminal.
    pub fn new() -> Result<Self> {
        Ok(Self {
            terminal: Self::setup_terminal()?,
        })
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()
            .map_err(|e| GiantError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .map_err(|e| GiantError::internal(format!("Failed to enter alternate screen: {e}")))?;

        Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| GiantError::internal(format!("Failed to create terminal: {e}")))
    }

    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| GiantError::internal(format!("Failed to disable raw mode: {e}")))?;

        execute!(
            self.terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        )
        .map_err(|e| GiantError::internal(format!("Failed to leave alternate screen: {e}")))?;

        self.terminal
            .show_cursor()
            .map_err(|e| GiantError::internal(format!("Failed to show cursor: {e}")))
    }

    /// Runs the event loop until the user quits or the last window closes.
    ///
    /// `initial` is opened first; without it a new unbound project is created.
    pub async fn run(
        &mut self,
        shell: ShellHandle,
        tx: mpsc::Sender<UiMessage>,
        mut rx: mpsc::Receiver<UiMessage>,
        initial: Option<OpenTarget>,
    ) -> Result<()> {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        let runner = Runner::new(shell, tx);

        match initial {
            Some(target) => runner.spawn(Action::Open(target)),
            None => runner.spawn(Action::NewWindow),
        }

        let mut app = App::new();
        let result = self.run_event_loop(&mut app, &runner, &mut rx).await;

        if let Err(e) = runner.shell.shutdown().await {
            debug!("Shell already stopped: {e}");
        }

        let _ = panic::take_hook();
        result
    }

    async fn run_event_loop(
        &mut self,
        app: &mut App,
        runner: &Runner,
        rx: &mut mpsc::Receiver<UiMessage>,
    ) -> Result<()> {
        loop {
            app.clear_expired_toast();

            self.terminal
                .draw(|frame| ui::render(frame, app))
                .map_err(|e| GiantError::internal(format!("Failed to draw: {e}")))?;

            if !app.running {
                break;
            }

            let action = tokio::select! {
                event = tokio::task::spawn_blocking(|| events::poll_event(events::TICK_RATE)) => {
                    match event {
                        Ok(Event::Key(key)) => app.handle_key(key),
                        Ok(Event::Paste(text)) => {
                            app.handle_paste(&text);
                            None
                        }
                        Ok(Event::Resize(..)) | Ok(Event::Tick) => None,
                        Err(e) => {
                            warn!("Event polling task failed: {e}");
                            None
                        }
                    }
                }

                Some(message) = rx.recv() => app.handle_message(message),
            };

            if let Some(action) = action {
                runner.spawn(action);
            }
        }

        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

/// Turns actions into shell requests on background tasks.
///
/// Each request reports back on `tx` as one [`UiMessage`].
pub struct Runner {
    shell: ShellHandle,
    dispatcher: QueryDispatcher,
    tx: mpsc::Sender<UiMessage>,
}

impl Runner {
    pub fn new(shell: ShellHandle, tx: mpsc::Sender<UiMessage>) -> Self {
        Self {
            dispatcher: QueryDispatcher::new(shell.clone()),
            shell,
            tx,
        }
    }

    /// Starts the work for `action`. `Quit` and `Focus` send no reply.
    pub fn spawn(&self, action: Action) {
        let shell = self.shell.clone();
        let tx = self.tx.clone();

        let message = match action {
            Action::Quit => {
                info!("Quit requested");
                return;
            }
            Action::Run {
                window,
                session,
                sql,
                settings,
            } => {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = dispatcher.dispatch(&sql, &settings).await;
                    UiMessage::Dispatched {
                        window,
                        session,
                        sql,
                        result,
                    }
                })
            }
            Action::Save {
                window,
                document,
                save_as,
            } => tokio::spawn(async move {
                UiMessage::Saved {
                    window,
                    result: shell.save_project(window, document, save_as).await,
                }
            }),
            Action::Open(target) => {
                tokio::spawn(async move { UiMessage::Opened(shell.open_project(target).await) })
            }
            Action::NewWindow => {
                tokio::spawn(async move { UiMessage::Created(shell.create_project(None).await) })
            }
            Action::Close(window) => tokio::spawn(async move {
                UiMessage::Closed {
                    window,
                    result: shell.close_window(window).await,
                }
            }),
            Action::Focus(window) => {
                tokio::spawn(async move {
                    if let Err(e) = shell.focus_window(window).await {
                        warn!(%window, "Focus request failed: {e}");
                    }
                });
                return;
            }
            Action::LoadDatasets(window) => tokio::spawn(async move {
                let result = match shell.current_project_id(window).await {
                    Ok(Some(project_id)) => shell.list_datasets(project_id).await,
                    Ok(None) => Ok(Vec::new()),
                    Err(e) => Err(e),
                };
                UiMessage::Datasets { window, result }
            }),
            Action::SetProjectId { window, project_id } => tokio::spawn(async move {
                UiMessage::ProjectIdSet {
                    window,
                    result: shell.set_current_project_id(window, project_id).await,
                }
            }),
        };

        tokio::spawn(async move {
            match message.await {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        debug!("UI closed before a reply arrived");
                    }
                }
                Err(e) => warn!("Background task failed: {e}"),
            }
        });
    }
}

/// Runs the TUI against a running shell.
pub async fn run(
    shell: ShellHandle,
    tx: mpsc::Sender<UiMessage>,
    rx: mpsc::Receiver<UiMessage>,
    initial: Option<OpenTarget>,
) -> Result<()> {
    let mut tui = Tui::new()?;
    tui.run(shell, tx, rx, initial).await
}
