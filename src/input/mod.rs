//! Input module for key and console events
//!
//! Maps key tokens to calculator inputs and reads console lines on a
//! dedicated thread.

mod keys;
mod listener;

pub use keys::{parse_key, Action, InputError, InputEvent};
pub use listener::{parse_line, ConsoleLine, ConsoleListener};
