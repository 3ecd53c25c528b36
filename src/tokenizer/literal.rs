//! # Numeric Literals
//!
//! A literal is `digits` or `digits.digits`. Anything looser (`3.`, `.5`, `1.2.3`)
//! is rejected here with a hard failure so the tokenizer can report it as a
//! malformed number instead of silently splitting it. So is a literal too large
//! for an `f64`.

use nom::{
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    error::{context, ErrorKind, ParseError, VerboseError},
    sequence::pair,
};

use super::token::{ParserResult, Token};

fn number_text(input: &str) -> ParserResult<&str> {
    context(
        "number literal",
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
    )(input)
}

/// Parses an integer or decimal literal into [`Token::Number`].
///
/// ```
/// # use agent_calc::tokenizer::literal::parse_number;
/// # use agent_calc::tokenizer::token::Token;
/// let (rest, token) = parse_number("12.5+1").unwrap();
/// assert_eq!(token, Token::Number(12.5));
/// assert_eq!(rest, "+1");
/// ```
#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_number(input: &str) -> ParserResult<Token> {
    let (rest, text) = number_text(input)?;
    // a trailing dot means the literal continues in a shape we do not accept
    if rest.starts_with('.') {
        return Err(nom::Err::Failure(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        )));
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok((rest, Token::Number(value))),
        _ => Err(nom::Err::Failure(VerboseError::from_error_kind(
            input,
            ErrorKind::Float,
        ))),
    }
}
