//! Analysis data model
//!
//! Result records produced by single-shot, live-frame and voice-command
//! analyses, plus the frame and reply types exchanged with the backend.

mod image;
mod reply;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use image::EncodedImage;
pub use reply::LiveReply;

/// What an analysis was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Detailed layout, objects and hazards
    SceneDescription,
    /// Read visible text
    OcrReading,
    /// One sentence about what is in front of the camera
    QuickSummary,
    /// Live navigation frame or voice command reply
    NavigatorFrame,
}

impl AnalysisKind {
    /// Kinds a user may request as a one-off analysis
    pub fn is_single_shot(self) -> bool {
        !matches!(self, AnalysisKind::NavigatorFrame)
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisKind::SceneDescription => write!(f, "scene_description"),
            AnalysisKind::OcrReading => write!(f, "ocr_reading"),
            AnalysisKind::QuickSummary => write!(f, "quick_summary"),
            AnalysisKind::NavigatorFrame => write!(f, "navigator_frame"),
        }
    }
}

/// The most recent completed analysis. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub kind: AnalysisKind,
    /// Unix epoch milliseconds
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,
}

impl AnalysisResult {
    pub fn new(text: impl Into<String>, kind: AnalysisKind) -> Self {
        Self {
            text: text.into(),
            kind,
            timestamp_ms: now_ms(),
            is_urgent: None,
        }
    }

    /// Result of a live-frame or voice-command reply
    pub fn navigator(reply: &LiveReply) -> Self {
        Self {
            is_urgent: Some(reply.is_urgent),
            ..Self::new(reply.speech.clone(), AnalysisKind::NavigatorFrame)
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_shot_kinds() {
        assert!(AnalysisKind::SceneDescription.is_single_shot());
        assert!(AnalysisKind::OcrReading.is_single_shot());
        assert!(AnalysisKind::QuickSummary.is_single_shot());
        assert!(!AnalysisKind::NavigatorFrame.is_single_shot());
    }

    #[test]
    fn test_navigator_result_carries_urgency() {
        let reply = LiveReply {
            speech: "Chair 1 meter ahead".to_string(),
            is_urgent: true,
        };
        let result = AnalysisResult::navigator(&reply);
        assert_eq!(result.kind, AnalysisKind::NavigatorFrame);
        assert_eq!(result.is_urgent, Some(true));
        assert_eq!(result.text, "Chair 1 meter ahead");
        assert!(result.timestamp_ms > 0);
    }

    #[test]
    fn test_single_shot_result_omits_urgency() {
        let result = AnalysisResult::new("No text detected.", AnalysisKind::OcrReading);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("ocr_reading"));
        assert!(!json.contains("is_urgent"));
    }
}
