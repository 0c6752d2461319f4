//! Voice command module
//!
//! Turns a streaming transcript into calculator results:
//! - Wake/stop phrase state machine over the accumulated transcript
//! - Expression extraction from natural language
//! - A restricted evaluator for flat operator chains
//! - Restart supervision of the transcript source

mod controller;
mod eval;
mod extract;
mod supervisor;
mod transcript;

pub use controller::{
    VoiceController, VoiceOutcome, VoicePhase, DEFAULT_STOP_PHRASE, DEFAULT_WAKE_PHRASE,
};
pub use supervisor::{RecognitionSupervisor, RestartDecision, RestartPolicy};
pub use transcript::{RecognitionError, TranscriptEvent, TranscriptFeed, TranscriptSegment};
