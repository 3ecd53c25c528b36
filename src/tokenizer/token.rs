use nom::{branch::alt, error::VerboseError, IResult};

use super::{
    literal::parse_number,
    symbol::{parse_delimiter, parse_operator, Delimiter, Operator},
    whitespace::parse_whitespace,
};
use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Operator(Operator),
    Delimiter(Delimiter),
    Whitespace(String),
}

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    current_position: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes `input`, dropping whitespace. Spans are byte offsets into `input`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn tokenize(&mut self, input: &str) -> Result<Vec<TokenSpan>, SyntaxError> {
        let mut tokens = Vec::new();
        let mut remaining = input;

        while !remaining.is_empty() {
            let start = self.current_position;
            let result = alt((parse_whitespace, parse_number, parse_operator, parse_delimiter))(
                remaining,
            );

            match result {
                Ok((new_remaining, token)) => {
                    self.current_position += remaining.len() - new_remaining.len();
                    remaining = new_remaining;
                    if matches!(token, Token::Whitespace(_)) {
                        continue;
                    }
                    tokens.push(TokenSpan {
                        token,
                        span: Span {
                            start,
                            end: self.current_position,
                        },
                    });
                }
                Err(_) => {
                    let error = self.unexpected(remaining);
                    tracing::debug!("{}", error);
                    return Err(error);
                }
            }
        }

        Ok(tokens)
    }

    fn unexpected(&self, remaining: &str) -> SyntaxError {
        let start = self.current_position;
        let numeric: String = remaining
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if !numeric.is_empty() {
            return SyntaxError::MalformedNumber {
                span: Span {
                    start,
                    end: start + numeric.len(),
                },
                found: numeric,
            };
        }
        let found = remaining.chars().next().unwrap_or_default();
        SyntaxError::InvalidCharacter {
            found,
            span: Span {
                start,
                end: start + found.len_utf8(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "column {}", self.start + 1)
    }
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;
