//! Key token definitions and mapping to calculator inputs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculator::Operator;

/// Control actions besides digits and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Clear,
    Delete,
    Compute,
    ToggleListening,
}

/// A single calculator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// `0`-`9` or `.`
    Digit(char),
    Operator(Operator),
    Action(Action),
}

impl From<Action> for InputEvent {
    fn from(action: Action) -> Self {
        InputEvent::Action(action)
    }
}

impl From<Operator> for InputEvent {
    fn from(op: Operator) -> Self {
        InputEvent::Operator(op)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Map a key token to an input
///
/// Accepts single characters (digits, `.`, ASCII operators and display
/// glyphs, `=`) and key or button names, case-insensitively.
pub fn parse_key(token: &str) -> Result<InputEvent, InputError> {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_digit() || c == '.' {
            return Ok(InputEvent::Digit(c));
        }
        if let Some(op) = Operator::from_char(c) {
            return Ok(op.into());
        }
        if c == '=' {
            return Ok(Action::Compute.into());
        }
    }

    let event = match token.to_ascii_lowercase().as_str() {
        "enter" | "equals" => Action::Compute.into(),
        "backspace" | "delete" | "del" => Action::Delete.into(),
        "escape" | "esc" | "clear" | "ac" => Action::Clear.into(),
        "mic" | "listen" => Action::ToggleListening.into(),
        "add" => Operator::Add.into(),
        "subtract" => Operator::Subtract.into(),
        "multiply" => Operator::Multiply.into(),
        "divide" => Operator::Divide.into(),
        _ => return Err(InputError::UnknownKey(token.to_string())),
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_and_decimal() {
        assert_eq!(parse_key("7"), Ok(InputEvent::Digit('7')));
        assert_eq!(parse_key("."), Ok(InputEvent::Digit('.')));
    }

    #[test]
    fn test_operator_symbols_and_glyphs() {
        assert_eq!(parse_key("-"), Ok(InputEvent::Operator(Operator::Subtract)));
        assert_eq!(parse_key("−"), Ok(InputEvent::Operator(Operator::Subtract)));
        assert_eq!(parse_key("×"), Ok(InputEvent::Operator(Operator::Multiply)));
        assert_eq!(parse_key("divide"), Ok(InputEvent::Operator(Operator::Divide)));
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(parse_key("="), Ok(InputEvent::Action(Action::Compute)));
        assert_eq!(parse_key("Enter"), Ok(InputEvent::Action(Action::Compute)));
        assert_eq!(parse_key("Backspace"), Ok(InputEvent::Action(Action::Delete)));
        assert_eq!(parse_key("Escape"), Ok(InputEvent::Action(Action::Clear)));
        assert_eq!(
            parse_key("mic"),
            Ok(InputEvent::Action(Action::ToggleListening))
        );
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            parse_key("pow"),
            Err(InputError::UnknownKey("pow".to_string()))
        );
        assert!(parse_key("x").is_err());
    }
}
