//! Console listener reading key tokens and simulated recognizer lines
//!
//! Runs on a dedicated thread since stdin reads block. Each line is
//! either a list of key tokens (`1 2 + 3 =`) or a recognizer command:
//! `say <text>`, `hear <text>`, `end`, `nospeech`, `error <reason>`.
//! `quit` requests shutdown; end of input only stops the listener.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::{parse_key, InputError, InputEvent};
use crate::lifecycle::ShutdownSignal;
use crate::voice::{RecognitionError, TranscriptEvent, TranscriptFeed, TranscriptSegment};

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Empty,
    Keys(Vec<InputEvent>),
    Transcript(TranscriptEvent),
    Quit,
}

/// Parse a console line
pub fn parse_line(line: &str) -> Result<ConsoleLine, InputError> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let parsed = match command.to_ascii_lowercase().as_str() {
        "" => ConsoleLine::Empty,
        "quit" | "exit" => ConsoleLine::Quit,
        "say" => ConsoleLine::Transcript(TranscriptEvent::Results(vec![
            TranscriptSegment::finalized(rest),
        ])),
        "hear" => ConsoleLine::Transcript(TranscriptEvent::Results(vec![
            TranscriptSegment::interim(rest),
        ])),
        "end" => ConsoleLine::Transcript(TranscriptEvent::Ended),
        "nospeech" => ConsoleLine::Transcript(TranscriptEvent::Error(RecognitionError::NoSpeech)),
        "error" => ConsoleLine::Transcript(TranscriptEvent::Error(
            RecognitionError::from_reason(rest),
        )),
        _ => ConsoleLine::Keys(
            line.split_whitespace()
                .map(parse_key)
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(parsed)
}

/// Reads stdin and forwards inputs and transcript lines
pub struct ConsoleListener {
    input_tx: mpsc::Sender<InputEvent>,
    feed: TranscriptFeed,
    shutdown: ShutdownSignal,
    running: Arc<AtomicBool>,
}

impl ConsoleListener {
    pub fn new(
        input_tx: mpsc::Sender<InputEvent>,
        feed: TranscriptFeed,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            input_tx,
            feed,
            shutdown,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the reader thread
    pub fn start(&self) -> std::io::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let input_tx = self.input_tx.clone();
        let feed = self.feed.clone();
        let shutdown = self.shutdown.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("console-listener".to_string())
            .spawn(move || {
                info!("console listener thread started");

                let stdin = std::io::stdin();
                let quit = read_lines(stdin.lock(), &input_tx, &feed, &running);

                running.store(false, Ordering::SeqCst);
                if quit {
                    shutdown.trigger();
                }
                info!("console listener thread stopped");
            })?;

        Ok(())
    }

    /// Stop forwarding; the thread exits after its current read
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// What the reader loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Continue,
    Quit,
    Disconnected,
}

/// Forward lines until quit, end of input, or the application goes away
///
/// Returns `true` only when the user asked to quit.
fn read_lines<R: BufRead>(
    reader: R,
    input_tx: &mpsc::Sender<InputEvent>,
    feed: &TranscriptFeed,
    running: &AtomicBool,
) -> bool {
    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(?e, "failed to read console input");
                return false;
            }
        };
        match dispatch(&line, input_tx, feed) {
            LineOutcome::Continue => {}
            LineOutcome::Quit => return true,
            LineOutcome::Disconnected => {
                debug!("application input closed");
                return false;
            }
        }
    }

    info!("console input closed, daemon keeps running");
    false
}

/// Forward one line
fn dispatch(
    line: &str,
    input_tx: &mpsc::Sender<InputEvent>,
    feed: &TranscriptFeed,
) -> LineOutcome {
    match parse_line(line) {
        Ok(ConsoleLine::Empty) => LineOutcome::Continue,
        Ok(ConsoleLine::Quit) => LineOutcome::Quit,
        Ok(ConsoleLine::Keys(events)) => {
            if events
                .into_iter()
                .all(|event| input_tx.blocking_send(event).is_ok())
            {
                LineOutcome::Continue
            } else {
                LineOutcome::Disconnected
            }
        }
        Ok(ConsoleLine::Transcript(event)) => {
            if !feed.blocking_push(event) {
                debug!("transcript line ignored, voice recognition is not running");
            }
            LineOutcome::Continue
        }
        Err(e) => {
            warn!(%e, "ignoring console line");
            LineOutcome::Continue
        }
    }
}
