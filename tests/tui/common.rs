//! Common test utilities for TUI tests.
//!
//! [`Harness`] wires an [`App`] to a real shell the way the event loop does,
//! minus the terminal: keys go through `handle_key`, actions through the
//! runner, and replies come back through `handle_message`.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use giant::config::ProjectSettings;
use giant::shell::Shell;
use giant::tui::{self, Action, App, Runner, TuiDialogs, UiMessage};
use giant::warehouse::MockWarehouseClient;
use tokio::sync::mpsc;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub app: App,
    pub client: Arc<MockWarehouseClient>,
    runner: Runner,
    rx: mpsc::Receiver<UiMessage>,
}

impl Harness {
    pub fn start(client: MockWarehouseClient, defaults: ProjectSettings) -> Self {
        let client = Arc::new(client);
        let (tx, rx) = tui::channel();
        let dialogs = Arc::new(TuiDialogs::new(tx.clone()));
        let (handle, shell) = Shell::spawn(client.clone(), dialogs, defaults);
        tokio::spawn(shell.run());

        Self {
            app: App::new(),
            client,
            runner: Runner::new(handle, tx),
            rx,
        }
    }

    pub fn perform(&self, action: Action) {
        self.runner.spawn(action);
    }

    /// Waits for the next background reply and applies it.
    pub async fn step(&mut self) {
        let message = tokio::time::timeout(REPLY_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for a UI message")
            .expect("UI channel closed");
        if let Some(action) = self.app.handle_message(message) {
            self.perform(action);
        }
    }

    pub fn press(&mut self, key: KeyEvent) {
        if let Some(action) = self.app.handle_key(key) {
            self.perform(action);
        }
    }

    pub fn press_code(&mut self, code: KeyCode) {
        self.press(KeyEvent::new(code, KeyModifiers::NONE));
    }

    pub fn ctrl(&mut self, c: char) {
        self.press(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press_code(KeyCode::Char(c));
        }
    }
}
