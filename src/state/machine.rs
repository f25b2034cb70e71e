//! Core mode state machine
//!
//! Handles transitions between Idle, CameraActive, Processing,
//! LiveAssistant and Error in response to user intents and analysis
//! completions.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::AssistantEvent;

/// The five operating modes of the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Camera off, nothing running
    #[default]
    Idle,
    /// Camera on, waiting for an intent
    CameraActive,
    /// A single-shot analysis is in flight
    Processing,
    /// Live navigation loop and voice commands are running
    LiveAssistant,
    /// The last single-shot analysis failed; the camera is still on
    Error,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::CameraActive => write!(f, "CameraActive"),
            Mode::Processing => write!(f, "Processing"),
            Mode::LiveAssistant => write!(f, "LiveAssistant"),
            Mode::Error => write!(f, "Error"),
        }
    }
}

/// Inputs that drive mode transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    CameraOn,
    CameraOff,
    AnalysisStarted,
    AnalysisSucceeded,
    AnalysisFailed,
    LiveOn,
    LiveOff,
}

impl Mode {
    /// Whether the camera is running in this mode
    pub fn camera_on(self) -> bool {
        self != Mode::Idle
    }

    /// Compute the mode reached by `event`, or `None` if the event is not
    /// permitted from this mode
    pub fn next(self, event: ModeEvent) -> Option<Mode> {
        use ModeEvent::*;

        match (self, event) {
            (Mode::Idle, CameraOn) => Some(Mode::CameraActive),
            // Camera off tears everything down regardless of what was running
            (m, CameraOff) if m.camera_on() => Some(Mode::Idle),
            (Mode::CameraActive | Mode::Error, AnalysisStarted) => Some(Mode::Processing),
            (Mode::Processing, AnalysisSucceeded) => Some(Mode::CameraActive),
            (Mode::Processing, AnalysisFailed) => Some(Mode::Error),
            (Mode::CameraActive | Mode::Error, LiveOn) => Some(Mode::LiveAssistant),
            (Mode::LiveAssistant, LiveOff) => Some(Mode::CameraActive),
            _ => None,
        }
    }
}

/// Owns the current mode and publishes transitions
pub struct ModeMachine {
    /// Current mode
    mode: Mode,
    /// Time when the current mode was entered
    entered_at: Instant,
    /// Channel for emitting mode change events
    event_tx: broadcast::Sender<AssistantEvent>,
}

impl ModeMachine {
    /// Create a new machine in Idle
    pub fn new(event_tx: broadcast::Sender<AssistantEvent>) -> Self {
        Self {
            mode: Mode::Idle,
            entered_at: Instant::now(),
            event_tx,
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Apply an event. Returns false (and leaves the mode untouched) when the
    /// event is not permitted from the current mode.
    pub fn apply(&mut self, event: ModeEvent) -> bool {
        match self.mode.next(event) {
            Some(next) => {
                self.transition_to(next);
                true
            }
            None => {
                debug!(mode = %self.mode, ?event, "mode event rejected");
                false
            }
        }
    }

    fn transition_to(&mut self, new_mode: Mode) {
        let old_mode = self.mode;
        let duration_ms = self.entered_at.elapsed().as_millis() as u64;

        info!(
            from = %old_mode,
            to = %new_mode,
            duration_ms = duration_ms,
            "mode transition"
        );

        self.mode = new_mode;
        self.entered_at = Instant::now();

        let _ = self.event_tx.send(AssistantEvent::ModeChanged {
            from: old_mode,
            to: new_mode,
            duration_ms,
        });
    }
}
