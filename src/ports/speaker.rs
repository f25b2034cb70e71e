//! Text-to-speech through an external command
//!
//! Each utterance is one child process (`espeak-ng <text>` by default).
//! Starting a new utterance kills the previous one, so there is only ever
//! one voice.

use std::sync::Mutex;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::SpeechOutput;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    /// `program args... <text>` is run for every utterance
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: Mutex::new(None),
        }
    }

    /// Whether an utterance is still playing
    #[cfg(test)]
    pub fn is_speaking(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn spawn_utterance(&self, text: &str) -> Result<Child, SpeechError> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    fn cancel(current: &mut Option<Child>) {
        if let Some(mut child) = current.take() {
            if let Err(e) = child.start_kill() {
                // Already exited
                debug!(?e, "utterance kill skipped");
            }
        }
    }
}

impl SpeechOutput for CommandSpeaker {
    fn speak(&self, text: &str) {
        let text = text.trim();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        Self::cancel(&mut current);

        if text.is_empty() {
            return;
        }

        match self.spawn_utterance(text) {
            Ok(child) => {
                debug!(chars = text.len(), "utterance started");
                *current = Some(child);
            }
            Err(e) => warn!(%e, "speech output failed"),
        }
    }

    fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        Self::cancel(&mut current);
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        let current = self.current.get_mut().unwrap_or_else(|e| e.into_inner());
        Self::cancel(current);
    }
}
