//! Shutdown signalling for the daemon

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Resolves on SIGTERM, SIGINT, or an explicit [`ShutdownSignal::trigger`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown from inside the process (console `quit`, end of input)
    pub fn trigger(&self) {
        self.requested.notify_one();
    }

    /// Wait for a shutdown request
    pub async fn wait(&self) {
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                warn!(?e, "failed to register signal handlers");
                self.requested.notified().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
            _ = self.requested.notified() => {
                debug!("shutdown requested");
            }
        }
    }
}
