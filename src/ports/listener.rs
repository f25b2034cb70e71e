//! Continuous speech recognition through an external command
//!
//! The recognizer command prints one transcript per line. Blank lines mean
//! "no speech detected" and are ignored. When the command exits it is
//! started again until listening is stopped.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{SpeechInput, TranscriptCallback};

const RESTART_DELAY: Duration = Duration::from_millis(100);
const SPAWN_FAILURE_DELAY: Duration = Duration::from_secs(1);

pub struct CommandListener {
    program: String,
    args: Vec<String>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CommandListener {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            task: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn is_listening(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl SpeechInput for CommandListener {
    fn start_listening(&self, on_transcript: TranscriptCallback) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());

        // Only one recognizer at a time
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let program = self.program.clone();
        let args = self.args.clone();
        *task = Some(tokio::spawn(recognize_forever(program, args, on_transcript)));
        info!("listening started");
    }

    fn stop_listening(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = task.take() {
            task.abort();
            info!("listening stopped");
        }
    }
}

impl Drop for CommandListener {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

async fn recognize_forever(program: String, args: Vec<String>, on_transcript: TranscriptCallback) {
    loop {
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(?e, %program, "failed to start recognizer");
                tokio::time::sleep(SPAWN_FAILURE_DELAY).await;
                continue;
            }
        };

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let transcript = line.trim();
                        if transcript.is_empty() {
                            continue;
                        }
                        debug!(chars = transcript.len(), "utterance recognized");
                        on_transcript(transcript.to_string());
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(?e, "recognizer output error");
                        break;
                    }
                }
            }
        }

        match child.wait().await {
            Ok(status) if !status.success() => debug!(%status, "recognizer exited"),
            Ok(_) => {}
            Err(e) => warn!(?e, "failed to wait on recognizer"),
        }

        tokio::time::sleep(RESTART_DELAY).await;
    }
}
