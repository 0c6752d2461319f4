//! Transcript events and the gated transcript source
//!
//! Recognizers (console, IPC clients) push updates through a
//! [`TranscriptFeed`]. The feed only forwards them while the source has been
//! started, so a stopped source never reaches the voice controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One recognized chunk of speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Final segments are never revised by the recognizer
    pub is_final: bool,
}

impl TranscriptSegment {
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Reason a recognizer reported an error
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RecognitionError {
    #[error("no speech detected")]
    NoSpeech,

    #[error("{0}")]
    Other(String),
}

impl RecognitionError {
    /// Map a recognizer's error code to an error
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "no-speech" | "no_speech" | "nospeech" => RecognitionError::NoSpeech,
            other => RecognitionError::Other(other.to_string()),
        }
    }
}

/// Updates delivered by a streaming recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Entries changed since the previous update, in recognition order
    Results(Vec<TranscriptSegment>),
    /// The recognition stream ended
    Ended,
    /// The recognizer reported an error
    Error(RecognitionError),
}

/// Failure to start a transcript source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("transcript channel closed")]
    ChannelClosed,

    #[error("transcript source unavailable: {0}")]
    Unavailable(String),
}

/// A streaming recognizer that can be started and stopped
pub trait TranscriptSource: Send {
    fn start(&mut self) -> Result<(), SourceError>;
    fn stop(&mut self);
}

/// Gated transcript source fed by external producers
#[derive(Debug, Clone)]
pub struct TranscriptFeed {
    tx: mpsc::Sender<TranscriptEvent>,
    running: Arc<AtomicBool>,
}

impl TranscriptFeed {
    /// Create a feed and the receiver the application reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TranscriptEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let feed = Self {
            tx,
            running: Arc::new(AtomicBool::new(false)),
        };
        (feed, rx)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Forward an event from an async producer
    ///
    /// Returns `false` when the event was dropped because the source is
    /// stopped or the application has gone away.
    pub async fn push(&self, event: TranscriptEvent) -> bool {
        if !self.accept(&event) {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    /// Forward an event from a blocking producer thread
    pub fn blocking_push(&self, event: TranscriptEvent) -> bool {
        if !self.accept(&event) {
            return false;
        }
        self.tx.blocking_send(event).is_ok()
    }

    fn accept(&self, event: &TranscriptEvent) -> bool {
        if !self.is_running() {
            debug!(?event, "transcript source stopped, dropping event");
            return false;
        }
        if matches!(event, TranscriptEvent::Ended) {
            self.running.store(false, Ordering::SeqCst);
        }
        true
    }
}

impl TranscriptSource for TranscriptFeed {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.tx.is_closed() {
            return Err(SourceError::ChannelClosed);
        }
        self.running.store(true, Ordering::SeqCst);
        info!("transcript source started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("transcript source stopped");
        }
    }
}
