//! # Calculator
//!
//! Wires the standard topology and drives one session at a time:
//!
//! ```text
//! io (evaluator) ──Compute──▶ sum | sub | mul | div | pow
//!        ▲                              │
//!        └────────Result / Error────────┘
//! ```
//!
//! The evaluator is registered first, then the operators, so a reply sent in tick
//! `n` is read by the evaluator in tick `n + 1`. A session is driven until the
//! evaluator reaches a terminal phase or the tick budget runs out.

use std::{fmt, sync::Arc};

use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::agent::{EvaluatorAgent, OperatorAgent, Phase, RuntimeAgent};
use crate::compiler::{ExpressionCompiler, Postfix};
use crate::config::CalcConfig;
use crate::error::{Error, EvaluationError, InternalResult};
use crate::mailbox::Mailbox;
use crate::message::{AgentId, Message};
use crate::scheduler::Scheduler;
use crate::tokenizer::Operator;
use crate::trace::{JsonLinesSink, LogSink, Tracer};

/// Id of the evaluator agent in the standard topology.
pub const EVALUATOR_ID: &str = "io";

/// How a session ended, as seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Finished(f64),
    Failed(EvaluationError),
    /// The tick budget ran out before the evaluator reached a terminal phase.
    TimedOut { ticks: u64 },
}

impl Outcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Finished(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Outcome::Finished(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Finished(value) => write!(f, "{}", value),
            Outcome::Failed(error) => write!(f, "error: {}", error),
            Outcome::TimedOut { ticks } => write!(f, "timed out after {} ticks", ticks),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub expression: String,
    pub postfix: Postfix,
    pub outcome: Outcome,
    /// Ticks spent by this session.
    pub ticks: u64,
}

pub struct Calculator {
    scheduler: Scheduler<RuntimeAgent>,
    tick_budget: u64,
}

impl Calculator {
    /// Builds the standard topology with the trace sinks named in `config`.
    pub fn new(config: &CalcConfig) -> InternalResult<Self> {
        let mut tracer = Tracer::new();
        if config.trace.log_events {
            tracer.add_sink(Arc::new(LogSink));
        }
        if let Some(path) = &config.trace.file {
            tracer.add_sink(Arc::new(JsonLinesSink::create(path)?));
        }
        Self::with_tracer(config, tracer)
    }

    /// Builds the standard topology reporting to `tracer` only.
    pub fn with_tracer(config: &CalcConfig, tracer: Tracer) -> InternalResult<Self> {
        let mut scheduler: Scheduler<RuntimeAgent> =
            Scheduler::new(Mailbox::with_tracer(tracer));
        let compiler = ExpressionCompiler::new(config.parentheses);
        let evaluator = EvaluatorAgent::with_compiler(EVALUATOR_ID.into(), compiler);
        scheduler.register(evaluator.into())?;
        for operator in Operator::iter() {
            scheduler.register(OperatorAgent::new(operator).into())?;
        }
        info!(
            agents = scheduler.registry().len(),
            tick_budget = config.tick_budget,
            "calculator ready"
        );
        Ok(Self {
            scheduler,
            tick_budget: config.tick_budget,
        })
    }

    /// Compiles `expression` and runs it to an [`Outcome`].
    ///
    /// A syntax error is returned as [`Error::Syntax`] and nothing is sent.
    pub fn evaluate(&mut self, expression: &str) -> InternalResult<SessionReport> {
        self.set_expression(expression)?;
        self.run_session()
    }

    /// Starts a new session, discarding the previous one.
    pub fn set_expression(&mut self, expression: &str) -> InternalResult<()> {
        self.evaluator_mut()?.set_expression(expression)?;
        Ok(())
    }

    /// Ticks the current session until it ends or the budget is spent.
    pub fn run_session(&mut self) -> InternalResult<SessionReport> {
        let (ticks, done) = self.scheduler.run_until(self.tick_budget, |scheduler| {
            scheduler
                .agent(EVALUATOR_ID)
                .and_then(RuntimeAgent::as_evaluator)
                .map_or(true, |evaluator| evaluator.phase() != Phase::Running)
        });

        let evaluator = self.evaluator()?;
        let outcome = match (evaluator.phase(), evaluator.result(), evaluator.failure()) {
            (Phase::Finished, Some(value), _) => Outcome::Finished(value),
            (Phase::Error, _, Some(failure)) => Outcome::Failed(failure.clone()),
            (Phase::Running, _, _) if !done => {
                warn!(expression = evaluator.expression(), ticks, "session timed out");
                Outcome::TimedOut { ticks }
            }
            (phase, _, _) => {
                return Err(Error::internal(format!(
                    "session stopped in unexpected phase {}",
                    phase
                )))
            }
        };

        Ok(SessionReport {
            expression: evaluator.expression().to_string(),
            postfix: evaluator.program().clone(),
            outcome,
            ticks,
        })
    }

    pub fn tick(&mut self) {
        self.scheduler.tick();
    }

    pub fn phase(&self) -> InternalResult<Phase> {
        Ok(self.evaluator()?.phase())
    }

    /// Delivers a message from outside the agent set, as if it had been sent by
    /// `message.from`.
    pub fn inject(&mut self, message: Message) -> InternalResult<()> {
        self.scheduler.post(message)?;
        Ok(())
    }

    pub fn evaluator(&self) -> InternalResult<&EvaluatorAgent> {
        self.scheduler
            .agent(EVALUATOR_ID)
            .and_then(RuntimeAgent::as_evaluator)
            .ok_or_else(|| Error::internal("evaluator agent is not registered"))
    }

    fn evaluator_mut(&mut self) -> InternalResult<&mut EvaluatorAgent> {
        self.scheduler
            .agent_mut(EVALUATOR_ID)
            .and_then(RuntimeAgent::as_evaluator_mut)
            .ok_or_else(|| Error::internal("evaluator agent is not registered"))
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.scheduler.registry().ids().cloned().collect()
    }

    pub fn scheduler(&self) -> &Scheduler<RuntimeAgent> {
        &self.scheduler
    }

    pub fn tick_budget(&self) -> u64 {
        self.tick_budget
    }

    pub fn set_tick_budget(&mut self, tick_budget: u64) {
        self.tick_budget = tick_budget;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::SyntaxError;

    fn calculator() -> Calculator {
        Calculator::with_tracer(&CalcConfig::default(), Tracer::new()).unwrap()
    }

    #[test]
    fn test_topology() {
        let ids: Vec<String> = calculator()
            .agent_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["io", "sum", "sub", "mul", "div", "pow"]);
    }

    #[test]
    fn test_evaluate() {
        let mut calc = calculator();
        let report = calc.evaluate("2 + 3").unwrap();
        assert_eq!(report.outcome, Outcome::Finished(5.0));
        assert_eq!(report.postfix.to_string(), "2 3 +");
        assert_eq!(report.ticks, 4);
        assert_eq!(calc.phase().unwrap(), Phase::Finished);
    }

    #[test]
    fn test_syntax_error_is_synchronous() {
        let mut calc = calculator();
        let err = calc.evaluate("2 + x").unwrap_err();
        assert!(matches!(
            err,
            Error::Syntax(SyntaxError::InvalidCharacter { found: 'x', .. })
        ));
        assert_eq!(calc.phase().unwrap(), Phase::Idle);
        assert_eq!(calc.scheduler().mailbox().total_pending(), 0);
    }

    #[test]
    fn test_division_by_zero_fails_the_session() {
        let mut calc = calculator();
        let report = calc.evaluate("4 / 0").unwrap();
        match report.outcome {
            Outcome::Failed(EvaluationError::ComputeFault { detail }) => {
                assert!(detail.contains("division by zero"), "{}", detail)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_budget_exhaustion_times_out() {
        let mut calc = calculator();
        calc.set_tick_budget(2);
        let report = calc.evaluate("2 + 3").unwrap();
        assert_eq!(report.outcome, Outcome::TimedOut { ticks: 2 });
        assert_eq!(report.outcome.to_string(), "timed out after 2 ticks");
        assert_eq!(calc.phase().unwrap(), Phase::Running);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Finished(9.0).to_string(), "9");
        assert_eq!(
            Outcome::Failed(EvaluationError::MalformedResult { size: 0 }).to_string(),
            "error: unexpected final stack size: 0"
        );
    }
}
