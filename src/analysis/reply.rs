//! Structured replies from live-frame and voice-command analysis

use serde::{Deserialize, Serialize};

/// What to say, and whether it should cut off current speech
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveReply {
    #[serde(default)]
    pub speech: String,
    #[serde(default, rename = "isUrgent", alias = "is_urgent")]
    pub is_urgent: bool,
}

impl LiveReply {
    /// Reply with nothing to say
    pub fn silent() -> Self {
        Self::default()
    }

    /// Non-urgent reply speaking `text`
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            speech: text.into(),
            is_urgent: false,
        }
    }

    /// Whether there is anything to speak
    pub fn has_speech(&self) -> bool {
        !self.speech.trim().is_empty()
    }

    /// Parse model output leniently.
    ///
    /// Accepts a JSON object, optionally wrapped in a Markdown code fence.
    /// Anything else becomes a non-urgent reply carrying the raw text.
    pub fn from_model_text(text: &str) -> Self {
        let trimmed = text.trim();
        let body = strip_code_fence(trimmed);

        match serde_json::from_str::<LiveReply>(body) {
            Ok(reply) => reply,
            Err(_) => Self::say(trimmed),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the language tag line, e.g. ```json
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
