//! Dialogs answered inside the terminal UI.
//!
//! The shell asks through [`TuiDialogs`]; the request travels to the UI loop
//! as a [`UiMessage::Dialog`] and the answer comes back on a oneshot. If the
//! UI is gone the request declines or cancels.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::UiMessage;
use crate::shell::{ConfirmDecision, Dialogs};

/// A dialog waiting for the user.
#[derive(Debug)]
pub enum DialogRequest {
    ConfirmLargeQuery {
        estimated_bytes: u64,
        threshold_bytes: u64,
        reply: oneshot::Sender<ConfirmDecision>,
    },
    SavePath {
        suggested: Option<PathBuf>,
        reply: oneshot::Sender<Option<PathBuf>>,
    },
    OpenPath {
        reply: oneshot::Sender<Option<PathBuf>>,
    },
}

/// [`Dialogs`] implementation backed by the terminal UI.
#[derive(Clone)]
pub struct TuiDialogs {
    sender: mpsc::Sender<UiMessage>,
}

impl TuiDialogs {
    pub fn new(sender: mpsc::Sender<UiMessage>) -> Self {
        Self { sender }
    }

    async fn ask<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> DialogRequest) -> Option<T> {
        let (reply, answer) = oneshot::channel();
        if self
            .sender
            .send(UiMessage::Dialog(build(reply)))
            .await
            .is_err()
        {
            warn!("UI closed before dialog could be shown");
            return None;
        }
        answer.await.ok()
    }
}

#[async_trait]
impl Dialogs for TuiDialogs {
    async fn confirm_large_query(
        &self,
        estimated_bytes: u64,
        threshold_bytes: u64,
    ) -> ConfirmDecision {
        self.ask(|reply| DialogRequest::ConfirmLargeQuery {
            estimated_bytes,
            threshold_bytes,
            reply,
        })
        .await
        .unwrap_or_else(ConfirmDecision::decline)
    }

    async fn pick_save_path(&self, suggested: Option<PathBuf>) -> Option<PathBuf> {
        self.ask(|reply| DialogRequest::SavePath { suggested, reply })
            .await
            .flatten()
    }

    async fn pick_open_path(&self) -> Option<PathBuf> {
        self.ask(|reply| DialogRequest::OpenPath { reply })
            .await
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirm_round_trip() {
        let (tx, mut rx) = mpsc::channel(4);
        let dialogs = TuiDialogs::new(tx);

        let ui = tokio::spawn(async move {
            match rx.recv().await {
                Some(UiMessage::Dialog(DialogRequest::ConfirmLargeQuery {
                    estimated_bytes,
                    reply,
                    ..
                })) => {
                    assert_eq!(estimated_bytes, 42);
                    let _ = reply.send(ConfirmDecision::confirm().and_dont_show_again());
                }
                other => panic!("unexpected message {other:?}"),
            }
        });

        let decision = dialogs.confirm_large_query(42, 10).await;
        ui.await.unwrap();
        assert!(decision.confirmed);
        assert!(decision.dont_show_again);
    }

    #[tokio::test]
    async fn test_dropped_reply_declines() {
        let (tx, mut rx) = mpsc::channel(4);
        let dialogs = TuiDialogs::new(tx);

        tokio::spawn(async move {
            let _ = rx.recv().await;
        });

        let decision = dialogs.confirm_large_query(42, 10).await;
        assert_eq!(decision, ConfirmDecision::decline());
    }

    #[tokio::test]
    async fn test_closed_ui_cancels_path_pickers() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let dialogs = TuiDialogs::new(tx);

        assert_eq!(dialogs.pick_open_path().await, None);
        assert_eq!(dialogs.pick_save_path(None).await, None);
    }
}
