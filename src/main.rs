//! wayfinder-daemon: Background daemon for a camera-and-voice navigation assistant
//!
//! The daemon provides:
//! - A mode state machine driving camera, live navigation and one-off analyses
//! - A live loop that describes the path ahead at a fixed cadence
//! - Voice commands that interrupt the loop and are answered immediately
//! - IPC server for the presentation layer

mod analysis;
mod assistant;
mod backend;
mod config;
mod events;
mod ipc;
mod lifecycle;
mod ports;
mod state;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::assistant::{Assistant, Ports};
use crate::backend::GeminiClient;
use crate::config::Config;
use crate::events::AssistantEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::ports::{CommandListener, CommandSpeaker, SnapshotCamera};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "wayfinder-daemon starting");

    let config = Config::load()?;
    config.validate()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.snapshot_path, "configuration loaded");

    let mut shutdown = ShutdownSignal::new()?;

    let settings = &config.settings;
    let backend = GeminiClient::new(
        settings.backend.base_url.clone(),
        settings.backend.api_key.clone(),
        settings.backend.model.clone(),
        config.backend_timeout(),
    )?;
    let ports = Ports {
        camera: Arc::new(SnapshotCamera::new(config.snapshot_path.clone())),
        speaker: Arc::new(CommandSpeaker::new(
            settings.speech.tts_program.clone(),
            settings.speech.tts_args.clone(),
        )),
        listener: Arc::new(CommandListener::new(
            settings.speech.stt_program.clone(),
            settings.speech.stt_args.clone(),
        )),
        backend: Arc::new(backend),
    };

    // Assistant -> IPC subscribers and the log below
    let (event_tx, _) = broadcast::channel::<AssistantEvent>(64);
    let mut log_rx = event_tx.subscribe();

    let (assistant, handle) = Assistant::new(ports, config.timings(), event_tx);
    let assistant_task = tokio::spawn(assistant.run());

    let server = Server::new(&config.socket_path, handle.clone())?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event) => info!(%event, "assistant event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event log lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("assistant event stream closed");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    if let Ok(snapshot) = handle.status().await {
        info!(mode = %snapshot.mode, "assistant state at shutdown");
    }
    if let Err(e) = handle.shutdown().await {
        warn!(?e, "assistant already stopped");
    }
    if let Err(e) = assistant_task.await {
        error!(?e, "assistant task failed");
    }
    server.shutdown().await;

    info!("wayfinder-daemon stopped");

    Ok(())
}
