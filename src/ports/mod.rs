//! Collaborator interfaces consumed by the orchestrator
//!
//! Each external resource (camera, speech output, speech input, vision
//! backend) is an explicit handle injected into the assistant. Stop and
//! release operations are idempotent.

mod camera;
mod listener;
mod speaker;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::{AnalysisKind, EncodedImage, LiveReply};

pub use camera::SnapshotCamera;
pub use listener::CommandListener;
pub use speaker::CommandSpeaker;

/// Errors starting the camera
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera source unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the vision/language backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned no text")]
    Empty,

    #[error("unsupported analysis kind: {0}")]
    UnsupportedKind(AnalysisKind),
}

/// Camera frames
pub trait FrameSource: Send + Sync {
    /// Start the camera. Failure leaves the source inactive.
    fn acquire(&self) -> Result<(), CaptureError>;

    /// Stop the camera
    fn release(&self);

    fn is_active(&self) -> bool;

    /// Current frame, or `None` if inactive or no frame is available
    fn capture_frame(&self) -> Option<EncodedImage>;
}

/// Single global voice channel
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, cutting off any utterance in progress
    fn speak(&self, text: &str);

    /// Stop any utterance in progress
    fn stop(&self);
}

/// Invoked once per recognized utterance
pub type TranscriptCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Continuous speech recognition
pub trait SpeechInput: Send + Sync {
    /// Begin listening. Re-arms after every utterance until stopped.
    fn start_listening(&self, on_transcript: TranscriptCallback);

    fn stop_listening(&self);
}

/// Remote multimodal analysis
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// One-off analysis; `kind` must be a single-shot kind
    async fn analyze(&self, image: &EncodedImage, kind: AnalysisKind) -> Result<String, BackendError>;

    /// Navigation guidance for one live frame
    async fn analyze_live_frame(&self, image: &EncodedImage) -> Result<LiveReply, BackendError>;

    /// Answer a spoken question about the current frame
    async fn analyze_voice_command(
        &self,
        image: &EncodedImage,
        transcript: &str,
    ) -> Result<LiveReply, BackendError>;
}
