//! # agent-calc: Arithmetic on a Simulated Actor Runtime
//!
//! agent-calc evaluates arithmetic expressions without calling a single arithmetic
//! function directly. Every operation is a message: an evaluator agent sends a
//! compute request to the agent serving the operator and waits for the reply that
//! carries the same correlation id.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Tokenizer → Compiler → Postfix → Evaluator ⇄ Mailbox ⇄ Operator agents
//! ```
//!
//! ### Stage 1: Tokenization
//!
//! The [`tokenizer`] module turns the source into numbers, operators and
//! parentheses with nom parsers. Whitespace is discarded.
//!
//! ### Stage 2: Compilation
//!
//! The [`compiler`] module rejects foreign characters and reorders the tokens into
//! a postfix program with the shunting-yard algorithm.
//!
//! ### Stage 3: Evaluation
//!
//! The [`agent`] module holds the evaluator state machine and the five operator
//! agents. They never call each other; they exchange [`message::Message`]s.
//!
//! ## Runtime
//!
//! - Message routing ([`mailbox`])
//! - Registration and turn-taking ([`agent_registry`], [`scheduler`])
//! - Structured event log ([`trace`])
//! - Standard topology and the session driver ([`system`])
//! - Settings ([`config`]) and failures ([`error`])
//!
//! ```no_run
//! use agent_calc::{CalcConfig, Calculator, Outcome};
//!
//! let mut calculator = Calculator::new(&CalcConfig::default())?;
//! let report = calculator.evaluate("2 + 3 * 4 - 5 ^ 2 / 5")?;
//! assert_eq!(report.outcome, Outcome::Finished(9.0));
//! # Ok::<(), agent_calc::Error>(())
//! ```

pub mod agent;
pub mod agent_registry;
pub mod compiler;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod scheduler;
pub mod system;
pub mod tokenizer;
pub mod trace;

// Re-exports
pub use agent::{Agent, EvaluatorAgent, OperatorAgent, Phase, RuntimeAgent, StepContext};
pub use compiler::{ExpressionCompiler, ParenPolicy, Postfix, PostfixToken};
pub use config::CalcConfig;
pub use error::*;
pub use message::{AgentId, Message, MessageBody, MessageType};
pub use system::{Calculator, Outcome, SessionReport, EVALUATOR_ID};
pub use tokenizer::Operator;
