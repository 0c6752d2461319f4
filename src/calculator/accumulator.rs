//! Accumulator state machine
//!
//! Holds the operand being typed, the operand captured when an operator
//! was chosen, and at most one pending operator.

use thiserror::Error;
use tracing::debug;

use super::display::{display_number, DisplaySnapshot};
use super::operator::Operator;

/// Errors surfaced by accumulator operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("'{0}' is not a digit or decimal point")]
    InvalidDigit(char),

    #[error("cannot divide by zero")]
    DivisionByZero,

    #[error("result is too large to display")]
    Overflow,
}

/// Receiver for results computed outside the accumulator
pub trait ResultSink {
    /// Replace the displayed state with an externally computed value
    fn inject_result(&mut self, value: f64, echo: String);
}

/// Render a result the way it is stored in the current operand
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Covers negative zero
        return "0".to_string();
    }
    value.to_string()
}

/// Numeric entry state with a single pending operation
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    current_operand: String,
    previous_operand: String,
    pending_operator: Option<Operator>,
    equation_echo: Option<String>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            current_operand: "0".to_string(),
            previous_operand: String::new(),
            pending_operator: None,
            equation_echo: None,
        }
    }
}

impl Accumulator {
    /// Create an accumulator in its cleared state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_operand(&self) -> &str {
        &self.current_operand
    }

    pub fn previous_operand(&self) -> &str {
        &self.previous_operand
    }

    pub fn pending_operator(&self) -> Option<Operator> {
        self.pending_operator
    }

    pub fn equation_echo(&self) -> Option<&str> {
        self.equation_echo.as_deref()
    }

    /// Append a digit or the decimal point to the current operand
    pub fn append_digit(&mut self, token: char) -> Result<(), CalcError> {
        if !(token.is_ascii_digit() || token == '.') {
            return Err(CalcError::InvalidDigit(token));
        }

        if token == '.' && self.current_operand.contains('.') {
            return Ok(());
        }

        if self.current_operand.is_empty() {
            self.current_operand.push('0');
        }

        if self.current_operand == "0" && token != '.' {
            self.current_operand = token.to_string();
        } else {
            self.current_operand.push(token);
        }

        Ok(())
    }

    /// Select the pending operator, collapsing an existing chain first
    pub fn choose_operator(&mut self, op: Operator) -> Result<(), CalcError> {
        if self.current_operand.is_empty() {
            // No right-hand operand typed yet: only swap the operator
            if self.pending_operator.is_some() {
                debug!(operator = %op, "pending operator replaced");
                self.pending_operator = Some(op);
            }
            return Ok(());
        }

        if !self.previous_operand.is_empty() {
            self.compute()?;
        }

        self.pending_operator = Some(op);
        self.previous_operand = std::mem::take(&mut self.current_operand);
        self.equation_echo = None;
        Ok(())
    }

    /// Apply the pending operator to the two operands
    ///
    /// Returns `Ok(None)` when there is nothing to compute or an operand
    /// does not parse. Division by zero and overflow clear the accumulator.
    pub fn compute(&mut self) -> Result<Option<f64>, CalcError> {
        let Some(op) = self.pending_operator else {
            return Ok(None);
        };

        let (prev, current) = match (
            self.previous_operand.parse::<f64>(),
            self.current_operand.parse::<f64>(),
        ) {
            (Ok(prev), Ok(current)) => (prev, current),
            _ => {
                debug!(
                    previous = %self.previous_operand,
                    current = %self.current_operand,
                    "compute skipped, operand is not numeric"
                );
                return Ok(None);
            }
        };

        if op == Operator::Divide && current == 0.0 {
            self.clear();
            return Err(CalcError::DivisionByZero);
        }

        let result = op.apply(prev, current);
        if !result.is_finite() {
            self.clear();
            return Err(CalcError::Overflow);
        }

        self.current_operand = format_number(result);
        self.previous_operand.clear();
        self.pending_operator = None;
        self.equation_echo = None;
        Ok(Some(result))
    }

    /// Remove the last character of the current operand
    pub fn delete(&mut self) {
        if self.current_operand == "0" {
            return;
        }
        self.current_operand.pop();
        if self.current_operand.is_empty() {
            self.current_operand.push('0');
        }
    }

    /// Reset every field to its default
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Overwrite the current operand with a value computed elsewhere
    pub fn set_display_value(&mut self, value: f64, echo: impl Into<String>) {
        self.current_operand = format_number(value);
        self.equation_echo = Some(echo.into());
    }

    /// Project the state into display strings
    pub fn snapshot(&self) -> DisplaySnapshot {
        let previous = match (self.pending_operator, &self.equation_echo) {
            (Some(op), _) => format!("{} {}", display_number(&self.previous_operand), op.glyph()),
            (None, Some(echo)) => echo.clone(),
            (None, None) => String::new(),
        };

        DisplaySnapshot {
            current: display_number(&self.current_operand),
            previous,
        }
    }
}

impl ResultSink for Accumulator {
    fn inject_result(&mut self, value: f64, echo: String) {
        self.clear();
        self.set_display_value(value, echo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enter(acc: &mut Accumulator, digits: &str) {
        for c in digits.chars() {
            acc.append_digit(c).unwrap();
        }
    }

    #[test]
    fn test_initial_state() {
        let acc = Accumulator::new();
        assert_eq!(acc.current_operand(), "0");
        assert_eq!(acc.previous_operand(), "");
        assert_eq!(acc.pending_operator(), None);
    }

    #[test]
    fn test_leading_zero_replaced() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "12");
        acc.clear();
        acc.append_digit('5').unwrap();
        assert_eq!(acc.current_operand(), "5");
    }

    #[test]
    fn test_single_decimal_point() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "1.2.3..4");
        assert_eq!(acc.current_operand(), "1.234");
        assert_eq!(acc.current_operand().matches('.').count(), 1);
    }

    #[test]
    fn test_at_most_one_decimal_point_for_any_sequence() {
        const TOKENS: [char; 4] = ['0', '7', '.', '.'];

        for len in 1..=6u32 {
            for code in 0..TOKENS.len().pow(len) {
                let digits: String = (0..len)
                    .scan(code, |rest, _| {
                        let token = TOKENS[*rest % TOKENS.len()];
                        *rest /= TOKENS.len();
                        Some(token)
                    })
                    .collect();

                let mut fresh = Accumulator::new();
                enter(&mut fresh, &digits);

                let mut chained = Accumulator::new();
                enter(&mut chained, "4");
                chained.choose_operator(Operator::Multiply).unwrap();
                enter(&mut chained, &digits);

                for acc in [&fresh, &chained] {
                    let operand = acc.current_operand();
                    assert!(
                        operand.matches('.').count() <= 1,
                        "{digits:?} produced {operand:?}"
                    );
                    assert!(!operand.starts_with("00"), "{digits:?} produced {operand:?}");
                    assert!(!operand.starts_with('.'), "{digits:?} produced {operand:?}");
                }
            }
        }
    }

    #[test]
    fn test_decimal_after_zero_is_appended() {
        let mut acc = Accumulator::new();
        enter(&mut acc, ".5");
        assert_eq!(acc.current_operand(), "0.5");
    }

    #[test]
    fn test_decimal_after_operator_starts_at_zero() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "3");
        acc.choose_operator(Operator::Add).unwrap();
        enter(&mut acc, ".5");
        assert_eq!(acc.current_operand(), "0.5");
        assert_eq!(acc.compute().unwrap(), Some(3.5));
    }

    #[test]
    fn test_invalid_digit_rejected() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.append_digit('a'), Err(CalcError::InvalidDigit('a')));
        assert_eq!(acc.current_operand(), "0");
    }

    #[test]
    fn test_add_round_trip() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "7");
        acc.choose_operator(Operator::Add).unwrap();
        enter(&mut acc, "3");

        assert_eq!(acc.compute().unwrap(), Some(10.0));
        assert_eq!(acc.current_operand(), "10");
        assert_eq!(acc.pending_operator(), None);
        assert_eq!(acc.previous_operand(), "");
    }

    #[test]
    fn test_operator_twice_only_swaps_operator() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "8");
        acc.choose_operator(Operator::Add).unwrap();
        acc.choose_operator(Operator::Multiply).unwrap();

        assert_eq!(acc.previous_operand(), "8");
        assert_eq!(acc.current_operand(), "");
        assert_eq!(acc.pending_operator(), Some(Operator::Multiply));

        enter(&mut acc, "2");
        assert_eq!(acc.compute().unwrap(), Some(16.0));
    }

    #[test]
    fn test_operator_collapses_chain() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "2");
        acc.choose_operator(Operator::Add).unwrap();
        enter(&mut acc, "3");
        acc.choose_operator(Operator::Multiply).unwrap();

        assert_eq!(acc.previous_operand(), "5");
        assert_eq!(acc.pending_operator(), Some(Operator::Multiply));

        enter(&mut acc, "4");
        assert_eq!(acc.compute().unwrap(), Some(20.0));
    }

    #[test]
    fn test_divide_by_zero_clears() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "10");
        acc.choose_operator(Operator::Divide).unwrap();
        enter(&mut acc, "0");

        assert_eq!(acc.compute(), Err(CalcError::DivisionByZero));
        assert_eq!(acc, Accumulator::default());
    }

    #[test]
    fn test_divide_by_zero_during_chain() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "4");
        acc.choose_operator(Operator::Divide).unwrap();
        enter(&mut acc, "0.0");

        assert_eq!(
            acc.choose_operator(Operator::Add),
            Err(CalcError::DivisionByZero)
        );
        assert_eq!(acc, Accumulator::default());
    }

    #[test]
    fn test_overflow_clears() {
        let mut acc = Accumulator::new();
        acc.set_display_value(1e308, "1e308 =");
        acc.choose_operator(Operator::Multiply).unwrap();
        enter(&mut acc, "10");

        assert_eq!(acc.compute(), Err(CalcError::Overflow));
        assert_eq!(acc, Accumulator::default());
    }

    #[test]
    fn test_compute_without_operator_is_noop() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "42");
        assert_eq!(acc.compute().unwrap(), None);
        assert_eq!(acc.current_operand(), "42");
    }

    #[test]
    fn test_compute_with_missing_operand_is_noop() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "42");
        acc.choose_operator(Operator::Subtract).unwrap();

        assert_eq!(acc.compute().unwrap(), None);
        assert_eq!(acc.previous_operand(), "42");
        assert_eq!(acc.pending_operator(), Some(Operator::Subtract));
    }

    #[test]
    fn test_delete() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "123");
        acc.delete();
        assert_eq!(acc.current_operand(), "12");
        acc.delete();
        acc.delete();
        assert_eq!(acc.current_operand(), "0");
        acc.delete();
        assert_eq!(acc.current_operand(), "0");
    }

    #[test]
    fn test_fractional_result_is_stringified() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "7");
        acc.choose_operator(Operator::Divide).unwrap();
        enter(&mut acc, "2");
        assert_eq!(acc.compute().unwrap(), Some(3.5));
        assert_eq!(acc.current_operand(), "3.5");
    }

    #[test]
    fn test_negative_zero_formats_as_zero() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(13.0), "13");
    }

    #[test]
    fn test_inject_result_sets_echo() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "9");
        acc.choose_operator(Operator::Add).unwrap();

        acc.inject_result(13.0, "4 + 9 =".to_string());

        assert_eq!(acc.current_operand(), "13");
        assert_eq!(acc.pending_operator(), None);
        assert_eq!(acc.previous_operand(), "");
        let snapshot = acc.snapshot();
        assert_eq!(snapshot.current, "13");
        assert_eq!(snapshot.previous, "4 + 9 =");
    }

    #[test]
    fn test_injected_result_chains() {
        let mut acc = Accumulator::new();
        acc.inject_result(13.0, "4 + 9 =".to_string());
        acc.choose_operator(Operator::Multiply).unwrap();
        enter(&mut acc, "2");
        assert_eq!(acc.compute().unwrap(), Some(26.0));
        assert_eq!(acc.equation_echo(), None);
    }

    #[test]
    fn test_snapshot_shows_pending_glyph() {
        let mut acc = Accumulator::new();
        enter(&mut acc, "1234");
        acc.choose_operator(Operator::Subtract).unwrap();
        let snapshot = acc.snapshot();
        assert_eq!(snapshot.previous, "1,234 −");
        assert_eq!(snapshot.current, "");
    }
}
