//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisKind, AnalysisResult};
use crate::assistant::AssistantSnapshot;
use crate::events::AssistantEvent;
use crate::state::Mode;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Start or stop the camera
    ToggleCamera,

    /// Run a one-off analysis of the current frame
    Analyze { kind: AnalysisKind },

    /// Start or stop live navigation
    ToggleLive,

    /// Feed a recognized utterance, as if heard by the microphone
    Transcript { text: String },

    /// Subscribe to assistant event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Intent applied; mode after handling it
    Accepted { mode: Mode },

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients
    Notification { event: AssistantEvent },

    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    pub mode: Mode,

    /// Most recent analysis shown to the user
    pub result: Option<AnalysisResult>,

    /// Voice command being answered, empty when none
    pub transcript: String,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl DaemonStatus {
    pub fn new(snapshot: AssistantSnapshot, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: snapshot.mode,
            result: snapshot.result,
            transcript: snapshot.transcript,
            uptime_secs,
        }
    }
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self::new(AssistantSnapshot::default(), 0)
    }
}
