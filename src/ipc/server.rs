//! Unix domain socket server for IPC
//!
//! Forwards key presses and transcript updates from clients into the
//! application and pushes application events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::AppEvent;
use crate::input::{parse_key, InputEvent};
use crate::voice::{RecognitionError, TranscriptEvent, TranscriptFeed};

use super::protocol::{CalculatorStatus, Notification, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    context: ClientContext,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: CalculatorStatus,
    start_time: std::time::Instant,
}

/// Handles every client task needs
#[derive(Clone)]
struct ClientContext {
    state: Arc<RwLock<ServerState>>,
    input_tx: mpsc::Sender<InputEvent>,
    feed: TranscriptFeed,
    event_tx: broadcast::Sender<AppEvent>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        input_tx: mpsc::Sender<InputEvent>,
        feed: TranscriptFeed,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: CalculatorStatus::default(),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            context: ClientContext {
                state,
                input_tx,
                feed,
                event_tx,
            },
            shutdown_tx,
        })
    }

    /// Fold an application event into the status served to clients
    pub async fn apply_event(&self, event: &AppEvent) {
        self.context.state.write().await.status.apply(event);
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = self.context.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
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

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Handle a single client connection
///
/// Requests are read on a separate task so that waiting for the next
/// request never cancels a partial read when a notification is due.
async fn handle_client(stream: UnixStream, context: ClientContext) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let (request_tx, mut request_rx) = mpsc::channel::<Vec<u8>>(8);

    let read_task = tokio::spawn(async move {
        loop {
            match read_message(&mut reader).await {
                Ok(Some(body)) => {
                    if request_tx.send(body).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("client disconnected");
                    break;
                }
                Err(e) => {
                    warn!(?e, "failed to read request, disconnecting");
                    break;
                }
            }
        }
    });

    let mut events: Option<broadcast::Receiver<AppEvent>> = None;

    let result = loop {
        tokio::select! {
            body = request_rx.recv() => {
                let Some(body) = body else {
                    break Ok(());
                };

                let response = match serde_json::from_slice::<Request>(&body) {
                    Ok(request) => {
                        debug!(?request, "received request");
                        let (response, subscribe) = process_request(request, &context).await;
                        if subscribe && events.is_none() {
                            events = Some(context.event_tx.subscribe());
                            debug!("client subscribed to notifications");
                        }
                        response
                    }
                    Err(e) => Response::error("bad_request", e.to_string()),
                };

                if let Err(e) = write_message(&mut writer, &response).await {
                    break Err(e);
                }
            }
            event = next_event(&mut events) => match event {
                Ok(event) => {
                    if let Err(e) = write_message(&mut writer, &Notification::Event { event }).await {
                        break Err(e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    events = None;
                }
            },
        }
    };

    read_task.abort();
    result
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<AppEvent>>,
) -> Result<AppEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read one length-prefixed message body; `None` on clean disconnect
async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        bail!("message too large ({len} bytes)");
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("truncated message body")?;
    Ok(Some(body))
}

/// Send a length-prefixed JSON message
async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

/// Process a request and return a response
/// Returns (Response, should_subscribe)
async fn process_request(request: Request, context: &ClientContext) -> (Response, bool) {
    match request {
        Request::Ping => (Response::Pong, false),

        Request::GetStatus => {
            let mut state = context.state.write().await;
            state.status.uptime_secs = state.start_time.elapsed().as_secs();
            (Response::Status(state.status.clone()), false)
        }

        Request::Subscribe => (Response::Subscribed, true),

        Request::Press { key } => match parse_key(&key) {
            Ok(event) => (forward_input(context, event).await, false),
            Err(e) => (Response::error("unknown_key", e.to_string()), false),
        },

        Request::Operator { operator } => (forward_input(context, operator.into()).await, false),

        Request::Action { action } => (forward_input(context, action.into()).await, false),

        Request::Transcript { segments } => (
            forward_transcript(context, TranscriptEvent::Results(segments)).await,
            false,
        ),

        Request::TranscriptEnded => (
            forward_transcript(context, TranscriptEvent::Ended).await,
            false,
        ),

        Request::TranscriptError { reason } => (
            forward_transcript(
                context,
                TranscriptEvent::Error(RecognitionError::from_reason(&reason)),
            )
            .await,
            false,
        ),
    }
}

async fn forward_input(context: &ClientContext, event: InputEvent) -> Response {
    match context.input_tx.send(event).await {
        Ok(()) => Response::Accepted,
        Err(_) => Response::error("unavailable", "calculator is shutting down"),
    }
}

async fn forward_transcript(context: &ClientContext, event: TranscriptEvent) -> Response {
    if context.feed.push(event).await {
        Response::Accepted
    } else {
        Response::error("not_listening", "voice recognition is not running")
    }
}
