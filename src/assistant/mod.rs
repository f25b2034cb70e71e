//! Assistant orchestrator
//!
//! Interleaves the live navigation loop with voice-command interrupts and
//! one-off analyses, keeping at most one live or voice analysis in flight
//! and a single voice on the speech channel.

mod actor;
mod handle;
mod slot;
mod wakeup;


pub use actor::{Assistant, LoopTimings, Ports};
pub use handle::{AssistantHandle, AssistantSnapshot};

/// Fixed spoken and stored phrases
pub mod phrases {
    pub const CAMERA_STARTED: &str = "Camera started. Ready.";
    pub const CAMERA_UNAVAILABLE: &str = "Camera could not be started.";
    pub const CAPTURE_FAILED: &str = "Camera capture failed.";
    pub const ANALYZING: &str = "Analyzing...";
    pub const ERROR_SPOKEN: &str = "Error processing.";
    pub const ERROR_RESULT: &str = "Error processing image.";
    pub const LIVE_STARTED: &str = "Voice assistant active. I am listening.";
    pub const LIVE_STOPPED: &str = "Live navigation stopped.";
}
