//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! assistant events to subscribed clients.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::assistant::{AssistantHandle, AssistantSnapshot};
use crate::events::AssistantEvent;

use super::protocol::{DaemonStatus, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    handle: AssistantHandle,
    snapshot_rx: watch::Receiver<AssistantSnapshot>,
    start_time: Instant,
    shutdown_tx: broadcast::Sender<()>,
}

/// What the reader half of a connection hands to the client loop
enum Inbound {
    Request(Request),
    Malformed(String),
    TooLarge(usize),
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(socket_path: &Path, handle: AssistantHandle) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            snapshot_rx: handle.watch(),
            handle,
            start_time: Instant::now(),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let handle = self.handle.clone();
                    let snapshot_rx = self.snapshot_rx.clone();
                    let start_time = self.start_time;
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, handle, snapshot_rx, start_time) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        handle: AssistantHandle,
        snapshot_rx: watch::Receiver<AssistantSnapshot>,
        start_time: Instant,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (tx, mut rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, tx));
        let mut events: Option<broadcast::Receiver<AssistantEvent>> = None;

        let result = loop {
            tokio::select! {
                inbound = rx.recv() => {
                    let response = match inbound {
                        None => break Ok(()),
                        Some(Inbound::TooLarge(len)) => {
                            warn!(len, "message too large, disconnecting");
                            break Ok(());
                        }
                        Some(Inbound::Malformed(message)) => {
                            debug!(%message, "malformed request");
                            Response::error("bad_request", message)
                        }
                        Some(Inbound::Request(request)) => {
                            debug!(?request, "received request");
                            if request == Request::Subscribe && events.is_none() {
                                events = Some(handle.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            Self::process_request(request, &handle, &snapshot_rx, start_time).await
                        }
                    };
                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }
                event = next_event(&mut events) => match event {
                    Ok(event) => {
                        if let Err(e) = Self::send_message(&mut writer, &Response::Notification { event }).await {
                            break Err(e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber lagged behind events");
                    }
                    Err(RecvError::Closed) => {
                        events = None;
                    }
                },
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until the client goes away
    async fn read_requests(mut stream: OwnedReadHalf, tx: mpsc::Sender<Inbound>) {
        let mut len_buf = [0u8; 4];

        loop {
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return;
                }
                Err(e) => {
                    warn!(?e, "client read error");
                    return;
                }
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                let _ = tx.send(Inbound::TooLarge(len)).await;
                return;
            }

            let mut msg_buf = vec![0u8; len];
            if let Err(e) = stream.read_exact(&mut msg_buf).await {
                warn!(?e, "client read error");
                return;
            }

            let inbound = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(request) => Inbound::Request(request),
                Err(e) => Inbound::Malformed(e.to_string()),
            };
            if tx.send(inbound).await.is_err() {
                return;
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<W, T>(stream: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: Serialize,
    {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(
        request: Request,
        handle: &AssistantHandle,
        snapshot_rx: &watch::Receiver<AssistantSnapshot>,
        start_time: Instant,
    ) -> Response {
        let applied = match request {
            Request::Ping => return Response::Pong,
            Request::Subscribe => return Response::Subscribed,
            Request::GetStatus => {
                let snapshot = snapshot_rx.borrow().clone();
                return Response::Status(DaemonStatus::new(snapshot, start_time.elapsed().as_secs()));
            }
            Request::ToggleCamera => handle.toggle_camera().await,
            Request::ToggleLive => handle.toggle_live().await,
            Request::Transcript { text } => handle.submit_transcript(text).await,
            Request::Analyze { kind } if !kind.is_single_shot() => {
                return Response::error("unsupported_kind", format!("{kind} is not a one-off analysis"));
            }
            Request::Analyze { kind } => handle.analyze(kind).await,
        };

        match applied {
            Ok(mode) => Response::Accepted { mode },
            Err(e) => Response::error("assistant_stopped", e.to_string()),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; never resolves otherwise
async fn next_event(events: &mut Option<broadcast::Receiver<AssistantEvent>>) -> Result<AssistantEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
