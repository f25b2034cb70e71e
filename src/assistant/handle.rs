//! Front door to the running assistant

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::analysis::{AnalysisKind, AnalysisResult};
use crate::events::AssistantEvent;
use crate::state::Mode;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant is not running")]
    Stopped,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantSnapshot {
    pub mode: Mode,
    pub result: Option<AnalysisResult>,
    /// Voice command currently being answered, empty when none
    pub transcript: String,
}

/// User intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ToggleCamera,
    Analyze(AnalysisKind),
    ToggleLive,
    Transcript(String),
}

/// Commands for the assistant actor
pub enum Command {
    /// Apply an intent and reply with the resulting mode
    Intent(Intent, oneshot::Sender<Mode>),
    Status(oneshot::Sender<AssistantSnapshot>),
    /// Release every resource and stop
    Shutdown(oneshot::Sender<()>),
}

/// Handle for communicating with the assistant
#[derive(Clone)]
pub struct AssistantHandle {
    tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<AssistantSnapshot>,
    event_tx: broadcast::Sender<AssistantEvent>,
}

impl AssistantHandle {
    pub(super) fn new(
        tx: mpsc::Sender<Command>,
        snapshot_rx: watch::Receiver<AssistantSnapshot>,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> Self {
        Self {
            tx,
            snapshot_rx,
            event_tx,
        }
    }

    pub async fn toggle_camera(&self) -> Result<Mode, AssistantError> {
        self.intent(Intent::ToggleCamera).await
    }

    pub async fn analyze(&self, kind: AnalysisKind) -> Result<Mode, AssistantError> {
        self.intent(Intent::Analyze(kind)).await
    }

    pub async fn toggle_live(&self) -> Result<Mode, AssistantError> {
        self.intent(Intent::ToggleLive).await
    }

    /// Deliver a recognized utterance, same as the speech input would
    pub async fn submit_transcript(&self, text: impl Into<String>) -> Result<Mode, AssistantError> {
        self.intent(Intent::Transcript(text.into())).await
    }

    async fn intent(&self, intent: Intent) -> Result<Mode, AssistantError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Intent(intent, reply))
            .await
            .map_err(|_| AssistantError::Stopped)?;
        rx.await.map_err(|_| AssistantError::Stopped)
    }

    /// Snapshot taken after every previously sent command was handled
    pub async fn status(&self) -> Result<AssistantSnapshot, AssistantError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Status(reply))
            .await
            .map_err(|_| AssistantError::Stopped)?;
        rx.await.map_err(|_| AssistantError::Stopped)
    }

    /// Latest published snapshot, readable without a round trip
    pub fn watch(&self) -> watch::Receiver<AssistantSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.event_tx.subscribe()
    }

    pub async fn shutdown(&self) -> Result<(), AssistantError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(reply))
            .await
            .map_err(|_| AssistantError::Stopped)?;
        rx.await.map_err(|_| AssistantError::Stopped)
    }
}
