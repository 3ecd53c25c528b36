//! # Whitespace Handling
//!
//! Whitespace is not a separator requirement in arithmetic input (`2+3` and `2 + 3`
//! tokenize identically). It is still matched as a token so spans stay accurate;
//! [`super::token::Tokenizer`] drops it from the output.

use nom::{bytes::complete::take_while1, combinator::map, error::context};

use super::token::{ParserResult, Token};

/// Parses a run of whitespace characters.
///
/// ```
/// # use agent_calc::tokenizer::whitespace::parse_whitespace;
/// # use agent_calc::tokenizer::token::Token;
/// let (rest, token) = parse_whitespace("  \t3").unwrap();
/// assert_eq!(token, Token::Whitespace("  \t".to_string()));
/// assert_eq!(rest, "3");
/// ```
#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_whitespace(input: &str) -> ParserResult<Token> {
    context(
        "whitespace",
        map(take_while1(char::is_whitespace), |ws: &str| {
            Token::Whitespace(ws.to_string())
        }),
    )(input)
}
