//! Output sinks for application events
//!
//! - Console display of the calculator lines, status and transcript
//! - Speech output through an optional external TTS command

mod console;
mod speaker;

pub use console::render_event;
pub use speaker::Speaker;
