//! Evaluator for flat arithmetic expressions
//!
//! Grammar: `operand (operator operand)*` where an operand is an optional
//! single sign followed by a decimal literal. Multiply and divide bind
//! tighter than add and subtract; equal precedence reduces left to right.

use thiserror::Error;

use crate::calculator::Operator;

/// Failure to parse or evaluate a voice expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { position: usize, found: String },

    #[error("expression ends after an operator")]
    UnexpectedEnd,

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("cannot divide by zero")]
    DivisionByZero,

    #[error("result is too large")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Operator(Operator),
}

/// A parsed operand chain, consumed by [`ParsedExpression::evaluate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    first: f64,
    rest: Vec<(Operator, f64)>,
}

impl ParsedExpression {
    /// Parse a sanitized expression string
    pub fn parse(input: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let mut tokens = tokens.into_iter().peekable();
        let first = parse_operand(&mut tokens)?;
        let mut rest = Vec::new();

        while let Some((position, token)) = tokens.next() {
            let op = match token {
                Token::Operator(op) => op,
                Token::Number(found) => {
                    return Err(ExpressionError::UnexpectedToken { position, found })
                }
            };
            rest.push((op, parse_operand(&mut tokens)?));
        }

        Ok(Self { first, rest })
    }

    /// Reduce the chain to a single value
    pub fn evaluate(&self) -> Result<f64, ExpressionError> {
        let mut total = 0.0;
        let mut additive = Operator::Add;
        let mut term = self.first;

        for &(op, value) in &self.rest {
            if op.binds_tight() {
                if op == Operator::Divide && value == 0.0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                term = op.apply(term, value);
            } else {
                total = additive.apply(total, term);
                additive = op;
                term = value;
            }
        }

        let result = additive.apply(total, term);
        if result.is_finite() {
            Ok(result)
        } else {
            Err(ExpressionError::Overflow)
        }
    }
}

/// Parse and evaluate in one step
pub fn evaluate(input: &str) -> Result<f64, ExpressionError> {
    ParsedExpression::parse(input)?.evaluate()
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !(c.is_ascii_digit() || c == '.') {
                    break;
                }
                literal.push(c);
                chars.next();
            }
            tokens.push((position, Token::Number(literal)));
        } else if let Some(op) = Operator::from_char(c) {
            tokens.push((position, Token::Operator(op)));
            chars.next();
        } else {
            return Err(ExpressionError::UnexpectedToken {
                position,
                found: c.to_string(),
            });
        }
    }

    Ok(tokens)
}

fn parse_operand<I>(tokens: &mut std::iter::Peekable<I>) -> Result<f64, ExpressionError>
where
    I: Iterator<Item = (usize, Token)>,
{
    let sign = match tokens.peek() {
        Some((_, Token::Operator(Operator::Subtract))) => {
            tokens.next();
            -1.0
        }
        Some((_, Token::Operator(Operator::Add))) => {
            tokens.next();
            1.0
        }
        _ => 1.0,
    };

    match tokens.next() {
        Some((_, Token::Number(literal))) => literal
            .parse::<f64>()
            .map(|value| sign * value)
            .map_err(|_| ExpressionError::InvalidNumber(literal)),
        Some((position, Token::Operator(op))) => Err(ExpressionError::UnexpectedToken {
            position,
            found: op.symbol().to_string(),
        }),
        None => Err(ExpressionError::UnexpectedEnd),
    }
}
