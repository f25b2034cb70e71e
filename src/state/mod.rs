//! State machine module for mode management
//!
//! Provides an explicit state machine with five modes:
//! - Idle: camera off
//! - CameraActive: camera on, waiting for an intent
//! - Processing: single-shot analysis in flight
//! - LiveAssistant: live navigation loop plus voice commands
//! - Error: last single-shot analysis failed

mod machine;

pub use machine::{Mode, ModeEvent, ModeMachine};
