//! Display projection of accumulator state

use serde::{Deserialize, Serialize};

/// Text shown on the two display lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Current operand line
    pub current: String,
    /// Previous operand with pending operator, or the equation echo
    pub previous: String,
}

/// Group the integer part with commas and keep the decimal fragment verbatim
///
/// `"1234567.50"` renders as `"1,234,567.50"` and `"12."` as `"12."`. An
/// integer part that is not a number renders as an empty string.
pub fn display_number(operand: &str) -> String {
    let (integer, fraction) = match operand.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (operand, None),
    };

    let integer_display = group_integer(integer).unwrap_or_default();

    match fraction {
        Some(fraction) => format!("{integer_display}.{fraction}"),
        None => integer_display,
    }
}

fn group_integer(integer: &str) -> Option<String> {
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = digits.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    grouped.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    Some(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        assert_eq!(display_number("0"), "0");
        assert_eq!(display_number("999"), "999");
        assert_eq!(display_number("1000"), "1,000");
        assert_eq!(display_number("1234567"), "1,234,567");
        assert_eq!(display_number("-1234"), "-1,234");
    }

    #[test]
    fn test_decimal_fragment_kept_verbatim() {
        assert_eq!(display_number("1234567.50"), "1,234,567.50");
        assert_eq!(display_number("12."), "12.");
        assert_eq!(display_number("0.000"), "0.000");
    }

    #[test]
    fn test_empty_and_non_numeric() {
        assert_eq!(display_number(""), "");
        assert_eq!(display_number("-"), "");
        assert_eq!(display_number(".5"), ".5");
    }
}
