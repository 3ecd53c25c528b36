//! # Evaluator Agent
//!
//! Runs one postfix program per session through a small state machine:
//!
//! ```text
//!            set_expression
//! Idle ─────────────────────▶ Running ──┬──▶ Finished
//!  ▲                            ▲       └──▶ Error
//!  │  (syntax error)            │ set_expression
//!  └────────────────────────────┴──────── Finished | Error
//! ```
//!
//! Numbers are pushed onto the operand stack. An operator pops `b` then `a` and
//! sends a compute request to the agent serving it; the evaluator then waits
//! until a reply with the same `op_id` arrives. Only one request is outstanding at
//! a time, so the program is evaluated strictly in postfix order.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Agent, StepContext};
use crate::compiler::{ExpressionCompiler, Postfix, PostfixToken};
use crate::error::{ComputeFault, EvaluationError, SyntaxError};
use crate::message::{AgentId, Message, MessageBody};
use crate::trace::TraceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Running,
    Error,
    Finished,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Error | Phase::Finished)
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorAgent {
    id: AgentId,
    compiler: ExpressionCompiler,
    expression: String,
    postfix: Postfix,
    program_counter: usize,
    operand_stack: Vec<f64>,
    waiting_op_id: Option<Uuid>,
    phase: Phase,
    result: Option<f64>,
    failure: Option<EvaluationError>,
    announce: bool,
}

impl EvaluatorAgent {
    pub fn new(id: AgentId) -> Self {
        Self::with_compiler(id, ExpressionCompiler::default())
    }

    pub fn with_compiler(id: AgentId, compiler: ExpressionCompiler) -> Self {
        Self {
            id,
            compiler,
            expression: String::new(),
            postfix: Postfix::default(),
            program_counter: 0,
            operand_stack: Vec::new(),
            waiting_op_id: None,
            phase: Phase::Idle,
            result: None,
            failure: None,
            announce: false,
        }
    }

    /// Compiles `text` and starts a new session.
    ///
    /// All state of the previous session is discarded first. On a syntax error the
    /// agent is left `Idle` and the error is returned to the caller.
    pub fn set_expression(&mut self, text: &str) -> Result<(), SyntaxError> {
        self.reset();
        let postfix = self.compiler.compile(text)?;
        self.start(text.trim().to_string(), postfix);
        Ok(())
    }

    /// Starts a new session on an already compiled program.
    pub fn load_program(&mut self, postfix: Postfix) {
        self.reset();
        self.start(postfix.to_string(), postfix);
    }

    fn reset(&mut self) {
        self.expression.clear();
        self.postfix = Postfix::default();
        self.program_counter = 0;
        self.operand_stack.clear();
        self.waiting_op_id = None;
        self.phase = Phase::Idle;
        self.result = None;
        self.failure = None;
        self.announce = false;
    }

    fn start(&mut self, expression: String, postfix: Postfix) {
        debug!(agent = %self.id, %expression, %postfix, "session loaded");
        self.expression = expression;
        self.postfix = postfix;
        self.phase = Phase::Running;
        self.announce = true;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn program(&self) -> &Postfix {
        &self.postfix
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn operand_stack(&self) -> &[f64] {
        &self.operand_stack
    }

    pub fn waiting_op_id(&self) -> Option<Uuid> {
        self.waiting_op_id
    }

    /// The session value once `Finished`.
    pub fn result(&self) -> Option<f64> {
        self.result
    }

    /// The recorded failure once in `Error`.
    pub fn failure(&self) -> Option<&EvaluationError> {
        self.failure.as_ref()
    }

    fn accept(&mut self, message: Message, ctx: &mut StepContext<'_>) {
        let correlated =
            self.phase == Phase::Running && self.waiting_op_id == Some(message.op_id());
        if !correlated {
            self.drop_message(message, "no outstanding request with this op id", ctx);
            return;
        }

        match message.body {
            MessageBody::Result { result, .. } => {
                debug!(agent = %self.id, result, "operand received");
                self.operand_stack.push(result);
                self.waiting_op_id = None;
            }
            MessageBody::Error { detail, op_id } => {
                self.waiting_op_id = None;
                self.fail(EvaluationError::ComputeFault { detail }, Some(op_id), ctx);
            }
            MessageBody::Compute { .. } => {
                self.drop_message(message, "evaluators do not serve compute requests", ctx)
            }
        }
    }

    fn drop_message(&self, message: Message, reason: &str, ctx: &mut StepContext<'_>) {
        warn!(agent = %self.id, %message, reason, "message dropped");
        ctx.trace(TraceEvent::Dropped {
            agent: self.id.clone(),
            message,
            reason: reason.to_string(),
        });
    }

    /// Performs one program action: consume a token or check the final stack.
    fn advance(&mut self, ctx: &mut StepContext<'_>) {
        match self.postfix.get(self.program_counter) {
            Some(PostfixToken::Number(value)) => {
                self.operand_stack.push(value);
                self.program_counter += 1;
            }
            Some(PostfixToken::Operator(operator)) => {
                let available = self.operand_stack.len();
                if available < 2 {
                    self.fail(
                        EvaluationError::StackUnderflow {
                            operator,
                            available,
                        },
                        None,
                        ctx,
                    );
                    return;
                }
                let operands = self.operand_stack.split_off(available - 2);
                let (a, b) = (operands[0], operands[1]);

                let op_id = Uuid::new_v4();
                let request = Message::compute(self.id.clone(), operator.agent_id(), a, b, op_id);
                match ctx.send(request) {
                    Ok(()) => {
                        self.waiting_op_id = Some(op_id);
                        self.program_counter += 1;
                    }
                    Err(e) => {
                        debug!(agent = %self.id, error = %e, "compute request undeliverable");
                        let fault = ComputeFault::UnknownOperator {
                            operator,
                            agent: operator.agent_name().to_string(),
                        };
                        self.fail(fault.into(), Some(op_id), ctx);
                    }
                }
            }
            None => self.finish(ctx),
        }
    }

    fn finish(&mut self, ctx: &mut StepContext<'_>) {
        match self.operand_stack.as_slice() {
            [value] => {
                let value = *value;
                self.result = Some(value);
                self.phase = Phase::Finished;
                info!(agent = %self.id, expression = %self.expression, result = value, "session finished");
                ctx.trace(TraceEvent::SessionFinished {
                    agent: self.id.clone(),
                    result: value,
                });
            }
            stack => {
                let size = stack.len();
                self.fail(EvaluationError::MalformedResult { size }, None, ctx);
            }
        }
    }

    fn fail(&mut self, error: EvaluationError, op_id: Option<Uuid>, ctx: &mut StepContext<'_>) {
        info!(agent = %self.id, expression = %self.expression, %error, "session failed");
        ctx.trace(TraceEvent::SessionFailed {
            agent: self.id.clone(),
            detail: error.to_string(),
            op_id,
        });
        self.phase = Phase::Error;
        self.failure = Some(error);
    }
}

impl Agent for EvaluatorAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) {
        let inbox = ctx.receive();

        if self.announce {
            self.announce = false;
            ctx.trace(TraceEvent::SessionStarted {
                agent: self.id.clone(),
                expression: self.expression.clone(),
                postfix: self.postfix.to_string(),
            });
        }

        for message in inbox {
            self.accept(message, ctx);
        }

        if self.phase != Phase::Running || self.waiting_op_id.is_some() {
            return;
        }
        self.advance(ctx);
    }
}
