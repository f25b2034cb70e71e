//! Gemini `generateContent` client
//!
//! Frames are sent inline as base64. Live-frame and voice-command calls
//! never fail: transport problems degrade to a fixed reply so the live
//! loop keeps running.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompts;
use crate::analysis::{AnalysisKind, EncodedImage, LiveReply};
use crate::ports::{BackendError, VisionBackend};

const VOICE_EMPTY_REPLY: &str = "I couldn't understand that.";
const VOICE_TRANSPORT_REPLY: &str = "Connection error.";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: &'a str,
        data: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate(
        &self,
        image: &EncodedImage,
        system: &str,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<String, BackendError> {
        let request = GenerateRequest {
            system_instruction: Content {
                parts: vec![Part::Text(system)],
            },
            contents: [Content {
                parts: vec![
                    Part::InlineData {
                        mime_type: &image.mime_type,
                        data: image.to_base64(),
                    },
                    Part::Text(prompt),
                ],
            }],
            generation_config: config,
        };

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: GenerateResponse = res
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let text = response.text();
        debug!(chars = text.len(), model = %self.model, "generateContent complete");
        Ok(text)
    }

    fn structured(temperature: f32) -> GenerationConfig {
        GenerationConfig {
            temperature,
            response_mime_type: Some("application/json"),
        }
    }
}

#[async_trait]
impl VisionBackend for GeminiClient {
    async fn analyze(&self, image: &EncodedImage, kind: AnalysisKind) -> Result<String, BackendError> {
        let prompt = prompts::single_shot(kind).ok_or(BackendError::UnsupportedKind(kind))?;
        let config = GenerationConfig {
            temperature: prompts::SINGLE_SHOT_TEMPERATURE,
            response_mime_type: None,
        };

        let text = self
            .generate(image, prompts::SINGLE_SHOT_SYSTEM, prompt, config)
            .await?;

        if text.trim().is_empty() {
            return Err(BackendError::Empty);
        }
        Ok(text)
    }

    async fn analyze_live_frame(&self, image: &EncodedImage) -> Result<LiveReply, BackendError> {
        let prompt = prompts::live_frame();
        let config = Self::structured(prompts::LIVE_TEMPERATURE);

        match self.generate(image, prompts::LIVE_SYSTEM, &prompt, config).await {
            // Stay quiet rather than announcing "No data" every cycle
            Ok(text) if text.trim().is_empty() => Ok(LiveReply::silent()),
            Ok(text) => Ok(LiveReply::from_model_text(&text)),
            Err(e) => {
                warn!(%e, "live frame analysis failed");
                Ok(LiveReply::silent())
            }
        }
    }

    async fn analyze_voice_command(
        &self,
        image: &EncodedImage,
        transcript: &str,
    ) -> Result<LiveReply, BackendError> {
        let prompt = prompts::voice_command(transcript);
        let config = Self::structured(prompts::VOICE_TEMPERATURE);

        match self.generate(image, prompts::VOICE_SYSTEM, &prompt, config).await {
            Ok(text) if text.trim().is_empty() => Ok(LiveReply::say(VOICE_EMPTY_REPLY)),
            Ok(text) => Ok(LiveReply::from_model_text(&text)),
            Err(e) => {
                warn!(%e, "voice command analysis failed");
                Ok(LiveReply::say(VOICE_TRANSPORT_REPLY))
            }
        }
    }
}
