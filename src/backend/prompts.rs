//! Prompt text and sampling settings per analysis

use crate::analysis::AnalysisKind;

pub const SINGLE_SHOT_SYSTEM: &str =
    "You describe camera images for a blind user. Be brief and accurate, and mention safety risks first.";

pub const LIVE_SYSTEM: &str =
    "You guide a blind user walking with a camera. Talk to them directly, in as few words as possible, with distances in meters.";

pub const VOICE_SYSTEM: &str =
    "You are a friendly voice assistant for a blind user who can see through their camera. Answer naturally.";

pub const SINGLE_SHOT_TEMPERATURE: f32 = 0.4;
pub const VOICE_TEMPERATURE: f32 = 0.3;
pub const LIVE_TEMPERATURE: f32 = 0.2;

const REPLY_FORMAT: &str = r#"Reply with JSON only: {"speech": "<what to say>", "isUrgent": <true|false>}"#;

/// Instruction for a single-shot analysis, or `None` for kinds that are not single-shot
pub fn single_shot(kind: AnalysisKind) -> Option<&'static str> {
    match kind {
        AnalysisKind::SceneDescription => Some(
            "Describe this scene for someone who cannot see it. \
             Give the overall layout, then the main objects with their position \
             (left, right, ahead, near, far). Call out obstacles and trip hazards \
             before anything else, and mention any people.",
        ),
        AnalysisKind::OcrReading => Some(
            "Read out all text visible in this image in natural reading order. \
             For long documents summarize the key points first. \
             If there is no text, say \"No text detected.\"",
        ),
        AnalysisKind::QuickSummary => Some(
            "In one short sentence, say what is directly in front of the camera.",
        ),
        AnalysisKind::NavigatorFrame => None,
    }
}

pub fn live_frame() -> String {
    format!(
        "Check the path ahead. Estimate the distance to each object \
         (very close under 1 m, near 1-2 m, medium 2-4 m, far beyond 4 m). \
         Anything very close or near in the middle of the path is urgent. \
         Finish with one direction: continue straight, move left, move right, or stop.\n\n{REPLY_FORMAT}"
    )
}

pub fn voice_command(transcript: &str) -> String {
    format!(
        "The user said: \"{transcript}\"\n\n\
         Answer or act on it using what the camera shows, in one or two short sentences. \
         If they ask for directions, look for obstacles and a clear path. \
         Mark the reply urgent if they are about to trip or collide.\n\n{REPLY_FORMAT}"
    )
}
