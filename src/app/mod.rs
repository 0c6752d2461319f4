//! Application context module
//!
//! Owns the accumulator, the voice controller and the recognition
//! supervisor, and drives them from a single event loop.

mod context;

pub use context::{App, VoiceSession};
