//! Natural language to arithmetic expression extraction

use std::sync::OnceLock;

use regex::Regex;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("valid number pattern"))
}

/// Word-operator substitutions applied by the fallback, in order
fn substitutions() -> &'static [(Regex, &'static str)] {
    static SUBSTITUTIONS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    SUBSTITUTIONS.get_or_init(|| {
        [
            (r"plus|to|and", "+"),
            (r"minus", "-"),
            (r"times|into", "*"),
            (r"divide", "/"),
            (r"by", ""),
            (r"add|subtract|multiply", ""),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid substitution pattern"),
                replacement,
            )
        })
        .collect()
    })
}

/// Build an expression string from a lower-cased transcript
///
/// Keyword commands ("add", "multiply", "subtract", "divide") are tried
/// first when at least two numbers were spoken; otherwise the transcript
/// is rewritten word by word.
pub fn extract_expression(transcript: &str, wake_phrase: &str, stop_phrase: &str) -> String {
    let numbers: Vec<&str> = number_pattern()
        .find_iter(transcript)
        .map(|m| m.as_str())
        .collect();

    if numbers.len() >= 2 {
        if transcript.contains("add") {
            return numbers.join(" + ");
        }
        if transcript.contains("multiply") {
            return numbers.join(" * ");
        }
        if transcript.contains("subtract") {
            return if transcript.contains("from") {
                format!("{} - {}", numbers[1], numbers[0])
            } else {
                format!("{} - {}", numbers[0], numbers[1])
            };
        }
        if transcript.contains("divide") {
            return format!("{} / {}", numbers[0], numbers[1]);
        }
    }

    rewrite_phrases(transcript, wake_phrase, stop_phrase)
}

fn rewrite_phrases(transcript: &str, wake_phrase: &str, stop_phrase: &str) -> String {
    let mut command = transcript.to_string();
    for filler in [wake_phrase, stop_phrase, "calculate", "equals"] {
        if !filler.is_empty() {
            command = command.replacen(filler, "", 1);
        }
    }

    for (pattern, replacement) in substitutions() {
        command = pattern.replace_all(&command, *replacement).into_owned();
    }

    command.trim().to_string()
}

/// Keep only digits, the four operator symbols, decimal points and spaces
pub fn sanitize_expression(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '.' | ' '))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAKE: &str = "get up calculator";
    const STOP: &str = "stop listening";

    fn extract(transcript: &str) -> String {
        extract_expression(transcript, WAKE, STOP)
    }

    #[test]
    fn test_add_joins_all_numbers() {
        assert_eq!(extract("please add 4 and 9 now"), "4 + 9");
        assert_eq!(extract("add 1 2 and 3 stop listening "), "1 + 2 + 3");
    }

    #[test]
    fn test_multiply_joins_all_numbers() {
        assert_eq!(extract("multiply 2 3 4"), "2 * 3 * 4");
    }

    #[test]
    fn test_subtract_from_reverses_order() {
        assert_eq!(extract("subtract 3 from 10"), "10 - 3");
        assert_eq!(extract("subtract 10 and 3"), "10 - 3");
    }

    #[test]
    fn test_divide_uses_first_two_numbers() {
        assert_eq!(extract("divide 20 by 4 and 2"), "20 / 4");
    }

    #[test]
    fn test_add_wins_over_other_keywords() {
        assert_eq!(extract("add 2 and 3 then multiply"), "2 + 3");
    }

    #[test]
    fn test_fallback_phrase_substitution() {
        assert_eq!(extract("calculate 5 plus 10 equals"), "5 + 10");
        assert_eq!(
            extract("calculate 5 plus 10 equals stop listening "),
            "5 + 10"
        );
        assert_eq!(extract("8 times 7"), "8 * 7");
        assert_eq!(extract("9 minus 4"), "9 - 4");
    }

    #[test]
    fn test_fallback_with_single_number() {
        assert_eq!(extract("add 5 stop listening "), "5");
    }

    #[test]
    fn test_divided_by_phrase() {
        assert_eq!(extract("12 divided by 4"), "12 / 4");
    }

    #[test]
    fn test_fallback_strips_wake_phrase() {
        assert_eq!(extract("get up calculator 6 plus 1"), "6 + 1");
    }

    #[test]
    fn test_substring_matching_is_not_word_aware() {
        // "addison" contains "add"
        assert_eq!(extract("addison has 2 and 5"), "2 + 5");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_expression("4 + 9; rm -rf"), "4 + 9  -");
        assert_eq!(sanitize_expression("hello"), "");
        assert_eq!(sanitize_expression("1.5 * (2)"), "1.5 * 2");
    }
}
