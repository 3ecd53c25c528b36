//! # Expression Tokenizer
//!
//! Turns arithmetic source text into a stream of [`token::Token`]s with byte spans.
//!
//! Recognized lexemes:
//!
//! * numeric literals, integer (`42`) or decimal (`4.2`)
//! * the five binary operators `+ - * / ^` ([`symbol::Operator`])
//! * parentheses ([`symbol::Delimiter`])
//! * whitespace, which is recognized and then discarded
//!
//! The parsers are written with `nom` combinators; [`token::Tokenizer`] drives them
//! and converts a failed match into a [`crate::error::SyntaxError`].

pub mod literal;
pub mod symbol;
pub mod token;
pub mod whitespace;

pub use symbol::{Delimiter, Operator};
pub use token::{Span, Token, TokenSpan, Tokenizer};
