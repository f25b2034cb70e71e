//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::LoopTimings;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// JPEG the external camera process keeps overwriting
    pub snapshot_path: PathBuf,

    /// Tunables read from `config.json` in the data directory
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub speech: SpeechSettings,
    pub timings: TimingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    pub model: String,
    /// Usually supplied through `GEMINI_API_KEY` instead
    #[serde(skip_serializing)]
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Text-to-speech command; the utterance is appended as the last argument
    pub tts_program: String,
    pub tts_args: Vec<String>,
    /// Speech-to-text command printing one transcript per line
    pub stt_program: String,
    pub stt_args: Vec<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            tts_program: "espeak-ng".to_string(),
            tts_args: vec!["-s".to_string(), "170".to_string()],
            stt_program: "wayfinder-stt".to_string(),
            stt_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub live_cadence_ms: u64,
    pub busy_retry_ms: u64,
    pub voice_cooldown_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        let defaults = LoopTimings::default();
        Self {
            live_cadence_ms: defaults.cadence.as_millis() as u64,
            busy_retry_ms: defaults.busy_retry.as_millis() as u64,
            voice_cooldown_ms: defaults.voice_cooldown.as_millis() as u64,
        }
    }
}

impl From<&TimingSettings> for LoopTimings {
    fn from(t: &TimingSettings) -> Self {
        Self {
            cadence: Duration::from_millis(t.live_cadence_ms),
            busy_retry: Duration::from_millis(t.busy_retry_ms),
            voice_cooldown: Duration::from_millis(t.voice_cooldown_ms),
        }
    }
}

impl Config {
    /// Load configuration from defaults, `config.json` and the environment
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("wayfinder");

        let settings_path = data_dir.join("config.json");
        let settings = if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("failed to read config file: {:?}", settings_path))?;
            let settings = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse config file: {:?}", settings_path))?;
            info!(?settings_path, "loaded settings");
            settings
        } else {
            Settings::default()
        };

        let mut config = Self::from_parts(&data_dir, settings);
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Build a configuration rooted at `data_dir`
    pub fn from_parts(data_dir: &Path, settings: Settings) -> Self {
        Self {
            socket_path: data_dir.join("daemon.sock"),
            data_dir: data_dir.to_owned(),
            snapshot_path: data_dir.join("camera").join("frame.jpg"),
            settings,
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("GEMINI_API_KEY") {
            self.settings.backend.api_key = key;
        }
        if let Some(path) = var("WAYFINDER_SOCKET") {
            self.socket_path = PathBuf::from(path);
        }
        if let Some(path) = var("WAYFINDER_SNAPSHOT") {
            self.snapshot_path = PathBuf::from(path);
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create data directory: {:?}", self.data_dir))?;
        Ok(())
    }

    pub fn timings(&self) -> LoopTimings {
        LoopTimings::from(&self.settings.timings)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.backend.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let backend = &self.settings.backend;
        if backend.base_url.is_empty() {
            anyhow::bail!("backend.base_url cannot be empty");
        }
        if backend.model.is_empty() {
            anyhow::bail!("backend.model cannot be empty");
        }
        if backend.api_key.is_empty() {
            anyhow::bail!("GEMINI_API_KEY is not set");
        }

        let t = &self.settings.timings;
        if t.live_cadence_ms == 0 || t.busy_retry_ms == 0 || t.voice_cooldown_ms == 0 {
            anyhow::bail!("timings must be greater than zero");
        }

        if self.settings.speech.tts_program.is_empty() || self.settings.speech.stt_program.is_empty() {
            anyhow::bail!("speech programs cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> Config {
        let mut config = Config::from_parts(Path::new("/tmp/wayfinder-test"), Settings::default());
        config.settings.backend.api_key = "key".to_string();
        config
    }

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.socket_path.to_string_lossy().contains("wayfinder"));
    }

    #[test]
    fn test_default_timings() {
        let config = config_with_key();
        assert_eq!(config.timings(), LoopTimings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_file() {
        let json = r#"{"timings":{"live_cadence_ms":3000},"speech":{"tts_program":"say","tts_args":[]}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.timings.live_cadence_ms, 3000);
        assert_eq!(settings.timings.voice_cooldown_ms, 4000);
        assert_eq!(settings.speech.tts_program, "say");
        assert_eq!(settings.speech.stt_program, "wayfinder-stt");
        assert_eq!(settings.backend.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_parts(Path::new("/data"), Settings::default());
        config.apply_env(|key| match key {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            "WAYFINDER_SNAPSHOT" => Some("/dev/shm/frame.jpg".to_string()),
            _ => None,
        });
        assert_eq!(config.settings.backend.api_key, "secret");
        assert_eq!(config.snapshot_path, PathBuf::from("/dev/shm/frame.jpg"));
        assert_eq!(config.socket_path, PathBuf::from("/data/daemon.sock"));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let settings = config_with_key().settings;
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_validate_rejects_missing_key_and_zero_timings() {
        let config = Config::from_parts(Path::new("/data"), Settings::default());
        assert!(config.validate().is_err());

        let mut config = config_with_key();
        config.settings.timings.busy_retry_ms = 0;
        assert!(config.validate().is_err());
    }
}
