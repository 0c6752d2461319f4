//! Voice command state machine
//!
//! Handles transitions between AwaitingWake and Listening based on the
//! accumulated transcript, and hands the transcript to the expression
//! pipeline once the stop phrase is heard.

use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::calculator::{format_number, ResultSink};
use crate::events::AppEvent;

use super::eval::{evaluate, ExpressionError};
use super::extract::{extract_expression, sanitize_expression};
use super::transcript::{RecognitionError, TranscriptSegment};

pub const DEFAULT_WAKE_PHRASE: &str = "get up calculator";
pub const DEFAULT_STOP_PHRASE: &str = "stop listening";

const NOT_UNDERSTOOD: &str = "Couldn't understand math, please try again.";

/// Phases of a voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePhase {
    /// Recognition is not running
    #[default]
    Idle,
    /// Waiting for the wake phrase
    AwaitingWake,
    /// Buffering a command until the stop phrase
    Listening,
}

impl std::fmt::Display for VoicePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoicePhase::Idle => write!(f, "Idle"),
            VoicePhase::AwaitingWake => write!(f, "AwaitingWake"),
            VoicePhase::Listening => write!(f, "Listening"),
        }
    }
}

/// Result of feeding one transcript update to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    /// Nothing relevant happened
    Ignored,
    /// Wake phrase heard, now listening
    WakeDetected,
    /// Listening, transcript forwarded to the live display
    Transcribing,
    /// Stop phrase heard and the expression evaluated
    Evaluated { expression: String, result: f64 },
    /// Stop phrase heard but the expression could not be evaluated
    Rejected {
        expression: String,
        error: ExpressionError,
    },
}

/// Wake/stop phrase state machine with its transcript buffer
pub struct VoiceController {
    phase: VoicePhase,
    /// Finalized segments since the last reset, each followed by a space
    transcript_buffer: String,
    wake_phrase: String,
    stop_phrase: String,
    /// Time when Listening was entered
    listening_since: Option<Instant>,
    event_tx: broadcast::Sender<AppEvent>,
}

impl VoiceController {
    pub fn new(
        wake_phrase: &str,
        stop_phrase: &str,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self {
            phase: VoicePhase::Idle,
            transcript_buffer: String::new(),
            wake_phrase: wake_phrase.trim().to_lowercase(),
            stop_phrase: stop_phrase.trim().to_lowercase(),
            listening_since: None,
            event_tx,
        }
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    pub fn transcript_buffer(&self) -> &str {
        &self.transcript_buffer
    }

    pub fn wake_phrase(&self) -> &str {
        &self.wake_phrase
    }

    /// Recognition is running, start waiting for the wake phrase
    pub fn arm(&mut self) {
        if self.phase == VoicePhase::Idle {
            self.transcript_buffer.clear();
            self.transition_to(VoicePhase::AwaitingWake);
            self.prompt_for_wake();
        }
    }

    /// Recognition stopped for good, drop any in-progress command
    pub fn disarm(&mut self) {
        if self.phase == VoicePhase::Listening {
            self.emit(AppEvent::ListeningStopped { evaluated: false });
            self.emit(AppEvent::LiveTranscript {
                text: String::new(),
            });
        }
        self.transcript_buffer.clear();
        self.transition_to(VoicePhase::Idle);
    }

    /// Manual listening toggle, equivalent to saying the wake phrase
    pub fn toggle(&mut self) -> VoicePhase {
        match self.phase {
            VoicePhase::Idle => {
                warn!("listening toggle ignored, voice recognition is not running");
                self.emit_status("Voice recognition is not running.");
            }
            VoicePhase::AwaitingWake => self.start_listening(),
            VoicePhase::Listening => {
                info!(
                    discarded = %self.transcript_buffer,
                    "listening cancelled, transcript discarded"
                );
                self.stop_listening(false);
            }
        }
        self.phase
    }

    /// Feed one transcript update
    pub fn handle_results<S: ResultSink>(
        &mut self,
        segments: &[TranscriptSegment],
        sink: &mut S,
    ) -> VoiceOutcome {
        if self.phase == VoicePhase::Idle {
            return VoiceOutcome::Ignored;
        }

        let mut interim = String::new();
        for segment in segments {
            if segment.is_final {
                self.transcript_buffer.push_str(&segment.text);
                self.transcript_buffer.push(' ');
            } else {
                interim.push_str(&segment.text);
            }
        }

        let full_transcript = format!("{}{}", self.transcript_buffer, interim).to_lowercase();
        debug!(phase = %self.phase, transcript = %full_transcript, "transcript updated");

        match self.phase {
            VoicePhase::AwaitingWake => {
                if full_transcript.contains(&self.wake_phrase) {
                    self.start_listening();
                    VoiceOutcome::WakeDetected
                } else {
                    self.trim_wake_buffer();
                    VoiceOutcome::Ignored
                }
            }
            VoicePhase::Listening => {
                self.emit(AppEvent::LiveTranscript {
                    text: full_transcript.clone(),
                });
                if full_transcript.contains(&self.stop_phrase) {
                    self.run_command(&full_transcript, sink)
                } else {
                    VoiceOutcome::Transcribing
                }
            }
            VoicePhase::Idle => VoiceOutcome::Ignored,
        }
    }

    /// Surface a recognizer error without changing phase
    pub fn handle_error(&self, error: &RecognitionError) {
        match error {
            RecognitionError::NoSpeech => {
                debug!("recognizer heard no speech");
                self.emit_status("No speech detected.");
            }
            RecognitionError::Other(reason) => {
                warn!(%reason, "speech recognition error");
                self.emit_status(&format!("Speech recognition error: {reason}"));
            }
        }
    }

    fn run_command<S: ResultSink>(&mut self, transcript: &str, sink: &mut S) -> VoiceOutcome {
        info!(%transcript, "stop phrase detected");

        let expression = sanitize_expression(&extract_expression(
            transcript,
            &self.wake_phrase,
            &self.stop_phrase,
        ));
        let result = evaluate(&expression);

        self.stop_listening(true);

        match result {
            Ok(value) => {
                info!(%expression, result = value, "voice expression evaluated");
                sink.inject_result(value, format!("{expression} ="));
                self.emit(AppEvent::Speak {
                    text: format!("The answer is {}", format_number(value)),
                });
                VoiceOutcome::Evaluated {
                    expression,
                    result: value,
                }
            }
            Err(error) => {
                warn!(%expression, %error, "voice expression rejected");
                let message = match &error {
                    ExpressionError::DivisionByZero => "Cannot divide by zero",
                    _ => NOT_UNDERSTOOD,
                };
                self.emit_status(message);
                VoiceOutcome::Rejected { expression, error }
            }
        }
    }

    fn start_listening(&mut self) {
        self.transcript_buffer.clear();
        self.transition_to(VoicePhase::Listening);
        self.emit(AppEvent::ListeningStarted);
        self.emit_status(&format!(
            "Listening... (Say \"{}\" to calculate)",
            self.stop_phrase
        ));
        self.emit(AppEvent::LiveTranscript {
            text: String::new(),
        });
        self.emit(AppEvent::Speak {
            text: "I'm listening.".to_string(),
        });
    }

    fn stop_listening(&mut self, evaluated: bool) {
        self.transcript_buffer.clear();
        self.transition_to(VoicePhase::AwaitingWake);
        self.emit(AppEvent::ListeningStopped { evaluated });
        self.emit(AppEvent::LiveTranscript {
            text: String::new(),
        });
        self.prompt_for_wake();
    }

    /// Keep only the tail that could still begin a wake phrase
    fn trim_wake_buffer(&mut self) {
        let keep = self.wake_phrase.len();
        if self.transcript_buffer.len() <= keep {
            return;
        }

        let mut start = self.transcript_buffer.len() - keep;
        while !self.transcript_buffer.is_char_boundary(start) {
            start -= 1;
        }
        self.transcript_buffer.drain(..start);
    }

    fn prompt_for_wake(&self) {
        self.emit_status(&format!("Say \"{}\"", self.wake_phrase));
    }

    fn transition_to(&mut self, new_phase: VoicePhase) {
        let old_phase = self.phase;
        if old_phase == new_phase {
            return;
        }

        let duration_ms = self
            .listening_since
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_phase,
            to = %new_phase,
            duration_ms = duration_ms,
            "voice phase transition"
        );

        self.phase = new_phase;
        self.listening_since = if new_phase == VoicePhase::Listening {
            Some(Instant::now())
        } else {
            None
        };
    }

    fn emit_status(&self, text: &str) {
        self.emit(AppEvent::Status {
            text: text.to_string(),
        });
    }

    fn emit(&self, event: AppEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}
