use thiserror::Error;

use crate::agent_registry::RegistryError;
use crate::mailbox::MailboxError;
use crate::tokenizer::{Operator, Span};
use crate::trace::TraceError;

/// Input rejected before it reaches the mailbox.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("unexpected character '{found}' at {span}")]
    InvalidCharacter { found: char, span: Span },

    #[error("malformed number '{found}' at {span}")]
    MalformedNumber { found: String, span: Span },

    #[error("unmatched '{paren}' at {span}")]
    UnmatchedParenthesis { paren: char, span: Span },
}

/// Why an operator could not produce a value. Travels as the detail of an `Error` message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeFault {
    #[error("division by zero ({dividend} / 0)")]
    DivisionByZero { dividend: f64 },

    #[error("{a} {operator} {b} is not a finite number")]
    NonFinite { a: f64, operator: Operator, b: f64 },

    #[error("unknown operator '{operator}': no agent registered as '{agent}'")]
    UnknownOperator { operator: Operator, agent: String },
}

/// Terminal failure of an evaluation session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("compute fault: {detail}")]
    ComputeFault { detail: String },

    #[error("stack underflow: '{operator}' needs 2 operands, found {available}")]
    StackUnderflow { operator: Operator, available: usize },

    #[error("unexpected final stack size: {size}")]
    MalformedResult { size: usize },
}

impl From<ComputeFault> for EvaluationError {
    fn from(fault: ComputeFault) -> Self {
        EvaluationError::ComputeFault {
            detail: fault.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
