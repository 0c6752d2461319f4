//! Calculator module for manual numeric entry
//!
//! Provides the accumulator state machine with a single pending operation:
//! - Operand entry (digits and one decimal point)
//! - Operator selection that collapses any pending chain
//! - Compute, delete, and clear
//!
//! Display formatting lives in [`display`] and is a pure projection of
//! accumulator state.

mod accumulator;
pub mod display;
mod operator;

pub use accumulator::{format_number, Accumulator, CalcError, ResultSink};
pub use display::DisplaySnapshot;
pub use operator::Operator;
