//! Events module for assistant state changes
//!
//! Every change to the observable assistant state (mode, latest result,
//! pending transcript, spoken output) is published as an `AssistantEvent`.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::state::Mode;

/// Events emitted by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// The operating mode changed
    ModeChanged {
        from: Mode,
        to: Mode,
        /// Time spent in the previous mode
        duration_ms: u64,
    },

    /// A completed analysis replaced the current result
    ResultUpdated { result: AnalysisResult },

    /// The pending voice transcript was set or cleared (empty text)
    TranscriptChanged { text: String },

    /// Text was handed to the speech output channel
    Spoke {
        text: String,
        /// Whether prior speech was cut off first
        urgent: bool,
    },
}

impl std::fmt::Display for AssistantEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantEvent::ModeChanged { from, to, duration_ms } => {
                write!(f, "MODE_CHANGED {} -> {} ({}ms)", from, to, duration_ms)
            }
            AssistantEvent::ResultUpdated { result } => {
                write!(f, "RESULT_UPDATED [{}]", result.kind)
            }
            AssistantEvent::TranscriptChanged { text } if text.is_empty() => {
                write!(f, "TRANSCRIPT_CLEARED")
            }
            AssistantEvent::TranscriptChanged { .. } => write!(f, "TRANSCRIPT_SET"),
            AssistantEvent::Spoke { urgent: true, .. } => write!(f, "SPOKE (urgent)"),
            AssistantEvent::Spoke { .. } => write!(f, "SPOKE"),
        }
    }
}
