//! # Operators and Delimiters
//!
//! The five binary operators double as routing keys: every [`Operator`] names the
//! well-known agent that computes it (see [`Operator::agent_id`]).
//!
//! ## Precedence
//!
//! | operator | precedence | associativity |
//! |----------|-----------:|---------------|
//! | `+` `-`  | 1          | left          |
//! | `*` `/`  | 2          | left          |
//! | `^`      | 3          | right         |

use nom::{branch::alt, character::complete::char, combinator::map, combinator::value, error::context};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::token::{ParserResult, Token};
use crate::error::ComputeFault;
use crate::message::AgentId;

/// A binary arithmetic operator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum Operator {
    /// Addition (`+`)
    #[strum(serialize = "+")]
    #[serde(rename = "+")]
    Add,
    /// Subtraction (`-`)
    #[strum(serialize = "-")]
    #[serde(rename = "-")]
    Sub,
    /// Multiplication (`*`)
    #[strum(serialize = "*")]
    #[serde(rename = "*")]
    Mul,
    /// Division (`/`)
    #[strum(serialize = "/")]
    #[serde(rename = "/")]
    Div,
    /// Exponentiation (`^`)
    #[strum(serialize = "^")]
    #[serde(rename = "^")]
    Pow,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div => 2,
            Operator::Pow => 3,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, Operator::Pow)
    }

    /// Well-known name of the agent serving this operator.
    pub fn agent_name(self) -> &'static str {
        match self {
            Operator::Add => "sum",
            Operator::Sub => "sub",
            Operator::Mul => "mul",
            Operator::Div => "div",
            Operator::Pow => "pow",
        }
    }

    pub fn agent_id(self) -> AgentId {
        AgentId::new(self.agent_name())
    }

    /// Applies the operator to `(a, b)` in that order.
    ///
    /// Division by zero and results that are not finite numbers are faults.
    ///
    /// ```
    /// # use agent_calc::tokenizer::symbol::Operator;
    /// assert_eq!(Operator::Sub.apply(7.0, 2.0), Ok(5.0));
    /// assert!(Operator::Div.apply(1.0, 0.0).is_err());
    /// ```
    pub fn apply(self, a: f64, b: f64) -> Result<f64, ComputeFault> {
        let value = match self {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => {
                if b == 0.0 {
                    return Err(ComputeFault::DivisionByZero { dividend: a });
                }
                a / b
            }
            Operator::Pow => a.powf(b),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ComputeFault::NonFinite {
                a,
                operator: self,
                b,
            })
        }
    }
}

/// Grouping delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum Delimiter {
    #[strum(serialize = "(")]
    OpenParen,
    #[strum(serialize = ")")]
    CloseParen,
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_operator(input: &str) -> ParserResult<Token> {
    context(
        "operator",
        map(
            alt((
                value(Operator::Add, char('+')),
                value(Operator::Sub, char('-')),
                value(Operator::Mul, char('*')),
                value(Operator::Div, char('/')),
                value(Operator::Pow, char('^')),
            )),
            Token::Operator,
        ),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_delimiter(input: &str) -> ParserResult<Token> {
    context(
        "delimiter",
        map(
            alt((
                value(Delimiter::OpenParen, char('(')),
                value(Delimiter::CloseParen, char(')')),
            )),
            Token::Delimiter,
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_operators() {
        let test_cases = [
            ("+", Operator::Add),
            ("-", Operator::Sub),
            ("*", Operator::Mul),
            ("/", Operator::Div),
            ("^", Operator::Pow),
        ];

        for (input, expected) in test_cases.iter() {
            let (rest, token) = parse_operator(input).unwrap();
            assert_eq!(token, Token::Operator(*expected));
            assert_eq!(rest, "");
            assert_eq!(Operator::from_str(input).unwrap(), *expected);
            assert_eq!(expected.to_string(), *input);
        }
    }

    #[test]
    fn test_delimiters() {
        let (rest, token) = parse_delimiter("()").unwrap();
        assert_eq!(token, Token::Delimiter(Delimiter::OpenParen));
        let (rest, token) = parse_delimiter(rest).unwrap();
        assert_eq!(token, Token::Delimiter(Delimiter::CloseParen));
        assert_eq!(rest, "");
    }

    #[test]
    fn test_agent_names_are_unique() {
        let mut names: Vec<_> = Operator::iter().map(Operator::agent_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names, vec!["div", "mul", "pow", "sub", "sum"]);
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert!(Operator::Pow.precedence() > Operator::Mul.precedence());
        assert_eq!(Operator::Mul.precedence(), Operator::Div.precedence());
        assert!(Operator::Mul.precedence() > Operator::Add.precedence());
        assert!(Operator::Pow.is_right_associative());
        assert!(!Operator::Sub.is_right_associative());
    }

    #[test]
    fn test_apply_preserves_operand_order() {
        assert_eq!(Operator::Sub.apply(2.0, 5.0), Ok(-3.0));
        assert_eq!(Operator::Div.apply(1.0, 4.0), Ok(0.25));
        assert_eq!(Operator::Pow.apply(2.0, 10.0), Ok(1024.0));
    }

    #[test]
    fn test_apply_faults() {
        assert_eq!(
            Operator::Div.apply(4.0, 0.0),
            Err(ComputeFault::DivisionByZero { dividend: 4.0 })
        );
        assert!(matches!(
            Operator::Pow.apply(-8.0, 0.5),
            Err(ComputeFault::NonFinite { .. })
        ));
        assert!(matches!(
            Operator::Pow.apply(10.0, 400.0),
            Err(ComputeFault::NonFinite { .. })
        ));
    }
}
