//! # Expression Compiler
//!
//! Converts infix arithmetic into a postfix (reverse Polish) [`Postfix`] program
//! with the shunting-yard algorithm.
//!
//! ```text
//! "2 + 3 * 4"  →  Tokenizer  →  shunting-yard  →  [2 3 4 * +]
//! ```
//!
//! When an incoming operator meets the pending-operator stack, the top is moved to
//! the output while it binds tighter, or binds equally and the incoming operator is
//! left-associative. `^` is the only right-associative operator, so `2 ^ 3 ^ 2`
//! compiles to `2 3 2 ^ ^`.
//!
//! Unbalanced parentheses follow the configured [`ParenPolicy`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SyntaxError;
use crate::tokenizer::{Delimiter, Operator, Span, Token, TokenSpan, Tokenizer};

/// How the compiler treats parentheses without a partner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParenPolicy {
    /// An unmatched `)` drains the pending operators down to the stack bottom and an
    /// unmatched `(` is discarded. Neither is reported.
    #[default]
    Permissive,
    /// Any unmatched parenthesis is a [`SyntaxError::UnmatchedParenthesis`].
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostfixToken {
    Number(f64),
    Operator(Operator),
}

impl fmt::Display for PostfixToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixToken::Number(value) => write!(f, "{}", value),
            PostfixToken::Operator(op) => write!(f, "{}", op),
        }
    }
}

/// A compiled program: operands and operators in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Postfix {
    tokens: Vec<PostfixToken>,
}

impl Postfix {
    pub fn new(tokens: Vec<PostfixToken>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[PostfixToken] {
        &self.tokens
    }

    pub fn get(&self, index: usize) -> Option<PostfixToken> {
        self.tokens.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<PostfixToken>> for Postfix {
    fn from(tokens: Vec<PostfixToken>) -> Self {
        Self::new(tokens)
    }
}

impl FromIterator<PostfixToken> for Postfix {
    fn from_iter<I: IntoIterator<Item = PostfixToken>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Postfix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

enum Pending {
    Operator(Operator),
    OpenParen(Span),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionCompiler {
    policy: ParenPolicy,
}

impl ExpressionCompiler {
    pub fn new(policy: ParenPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ParenPolicy {
        self.policy
    }

    /// Validates, tokenizes and converts `source` to postfix.
    ///
    /// Surrounding whitespace is skipped by the tokenizer, so error spans are
    /// offsets into `source` as given.
    ///
    /// ```
    /// # use agent_calc::compiler::ExpressionCompiler;
    /// let postfix = ExpressionCompiler::default().compile("2 + 3 * 4").unwrap();
    /// assert_eq!(postfix.to_string(), "2 3 4 * +");
    /// ```
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn compile(&self, source: &str) -> Result<Postfix, SyntaxError> {
        validate_charset(source)?;
        let tokens = Tokenizer::new().tokenize(source)?;
        let postfix = self.to_postfix(&tokens)?;
        debug!(%postfix, "compiled");
        Ok(postfix)
    }

    pub fn to_postfix(&self, tokens: &[TokenSpan]) -> Result<Postfix, SyntaxError> {
        let mut output = Vec::with_capacity(tokens.len());
        let mut pending: Vec<Pending> = Vec::new();

        for token_span in tokens {
            match &token_span.token {
                Token::Number(value) => output.push(PostfixToken::Number(*value)),
                Token::Operator(incoming) => {
                    while let Some(&Pending::Operator(top)) = pending.last() {
                        if !yields_to(top, *incoming) {
                            break;
                        }
                        output.push(PostfixToken::Operator(top));
                        pending.pop();
                    }
                    pending.push(Pending::Operator(*incoming));
                }
                Token::Delimiter(Delimiter::OpenParen) => {
                    pending.push(Pending::OpenParen(token_span.span))
                }
                Token::Delimiter(Delimiter::CloseParen) => {
                    self.close_group(&mut pending, &mut output, token_span.span)?
                }
                Token::Whitespace(_) => {}
            }
        }

        while let Some(entry) = pending.pop() {
            match entry {
                Pending::Operator(op) => output.push(PostfixToken::Operator(op)),
                Pending::OpenParen(span) => match self.policy {
                    ParenPolicy::Strict => {
                        return Err(SyntaxError::UnmatchedParenthesis { paren: '(', span })
                    }
                    ParenPolicy::Permissive => debug!(%span, "discarding unmatched '('"),
                },
            }
        }

        Ok(Postfix::new(output))
    }

    fn close_group(
        &self,
        pending: &mut Vec<Pending>,
        output: &mut Vec<PostfixToken>,
        span: Span,
    ) -> Result<(), SyntaxError> {
        loop {
            match pending.pop() {
                Some(Pending::Operator(op)) => output.push(PostfixToken::Operator(op)),
                Some(Pending::OpenParen(_)) => return Ok(()),
                None => {
                    return match self.policy {
                        ParenPolicy::Strict => {
                            Err(SyntaxError::UnmatchedParenthesis { paren: ')', span })
                        }
                        ParenPolicy::Permissive => {
                            debug!(%span, "unmatched ')' drained the operator stack");
                            Ok(())
                        }
                    };
                }
            }
        }
    }
}

/// True when `top` must be emitted before `incoming` is pushed.
fn yields_to(top: Operator, incoming: Operator) -> bool {
    top.precedence() > incoming.precedence()
        || (top.precedence() == incoming.precedence() && !incoming.is_right_associative())
}

/// Rejects anything outside digits, `.`, the five operators, parentheses and whitespace.
pub fn validate_charset(source: &str) -> Result<(), SyntaxError> {
    match source.char_indices().find(|(_, c)| !is_accepted(*c)) {
        Some((start, found)) => Err(SyntaxError::InvalidCharacter {
            found,
            span: Span {
                start,
                end: start + found.len_utf8(),
            },
        }),
        None => Ok(()),
    }
}

fn is_accepted(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | '+' | '-' | '*' | '/' | '^' | '(' | ')')
}
