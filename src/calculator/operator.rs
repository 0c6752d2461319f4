//! The four arithmetic operators and their glyph mappings

use serde::{Deserialize, Serialize};

/// One of the four supported binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// ASCII symbol used inside expressions
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    /// Glyph shown on the display
    pub fn glyph(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '−',
            Operator::Multiply => '×',
            Operator::Divide => '÷',
        }
    }

    /// Map either an ASCII symbol or a display glyph back to an operator
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' | '−' => Some(Operator::Subtract),
            '*' | '×' => Some(Operator::Multiply),
            '/' | '÷' => Some(Operator::Divide),
            _ => None,
        }
    }

    /// Multiply and divide bind tighter than add and subtract
    pub fn binds_tight(self) -> bool {
        matches!(self, Operator::Multiply | Operator::Divide)
    }

    /// Apply the operator without any zero or overflow checks
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => lhs / rhs,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_and_ascii_map_to_same_variant() {
        for op in [
            Operator::Add,
            Operator::Subtract,
            Operator::Multiply,
            Operator::Divide,
        ] {
            assert_eq!(Operator::from_char(op.symbol()), Some(op));
            assert_eq!(Operator::from_char(op.glyph()), Some(op));
        }
        assert_eq!(Operator::from_char('x'), None);
    }

    #[test]
    fn test_precedence() {
        assert!(Operator::Multiply.binds_tight());
        assert!(Operator::Divide.binds_tight());
        assert!(!Operator::Add.binds_tight());
        assert!(!Operator::Subtract.binds_tight());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Operator::Multiply).unwrap();
        assert_eq!(json, "\"multiply\"");
    }
}
