//! Terminal events and global key bindings.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// How long one poll waits before yielding a tick.
pub const TICK_RATE: Duration = Duration::from_millis(100);

/// Application events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// Bracketed paste from the terminal.
    Paste(String),
    Resize(u16, u16),
    Tick,
}

/// Blocks for up to `tick_rate` waiting for a terminal event.
///
/// Read failures and unhandled event kinds come back as ticks.
pub fn poll_event(tick_rate: Duration) -> Event {
    match event::poll(tick_rate) {
        Ok(true) => match event::read() {
            Ok(CrosstermEvent::Key(key)) if key.kind != KeyEventKind::Release => Event::Key(key),
            Ok(CrosstermEvent::Paste(text)) => Event::Paste(text),
            Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
            _ => Event::Tick,
        },
        _ => Event::Tick,
    }
}

/// Commands bound to keys regardless of the focused pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RunQuery,
    Save,
    SaveAs,
    Open,
    NewWindow,
    NewSession,
    ToggleSidebar,
    CloseWindow,
    Quit,
    NextWindow,
    ShowResults,
    ShowJobInfo,
    ShowSettings,
    NextPane,
}

/// Maps a key to its global command, if any.
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    let command = match key.code {
        KeyCode::F(5) => Command::RunQuery,
        KeyCode::Enter if ctrl => Command::RunQuery,
        KeyCode::Char('s') | KeyCode::Char('S') if ctrl && shift => Command::SaveAs,
        KeyCode::Char('s') if ctrl => Command::Save,
        KeyCode::F(12) => Command::SaveAs,
        KeyCode::Char('o') if ctrl => Command::Open,
        KeyCode::Char('n') if ctrl => Command::NewWindow,
        KeyCode::Char('t') if ctrl => Command::NewSession,
        KeyCode::Char('b') if ctrl => Command::ToggleSidebar,
        KeyCode::Char('w') if ctrl => Command::CloseWindow,
        KeyCode::Char('q') if ctrl => Command::Quit,
        KeyCode::Char('c') if ctrl => Command::Quit,
        KeyCode::F(6) => Command::NextWindow,
        KeyCode::F(2) => Command::ShowResults,
        KeyCode::F(3) => Command::ShowJobInfo,
        KeyCode::F(4) => Command::ShowSettings,
        KeyCode::Tab => Command::NextPane,
        _ => return None,
    };
    Some(command)
}
