//! # Agents
//!
//! An agent is a unit of private state advanced by the scheduler once per tick
//! through [`Agent::step`]. Everything an agent does to the outside world goes
//! through its [`StepContext`]: reading its own inbox, sending messages, and
//! reporting trace events.
//!
//! Two kinds exist:
//!
//! * [`OperatorAgent`]: stateless, bound to one operator, answers compute requests
//! * [`EvaluatorAgent`]: owns a postfix program and drives it to a result
//!
//! [`RuntimeAgent`] is the closed set the standard calculator registers.

pub mod evaluator;
pub mod operator;

pub use evaluator::{EvaluatorAgent, Phase};
pub use operator::OperatorAgent;

use tracing::warn;

use crate::mailbox::{Mailbox, MailboxError};
use crate::message::{AgentId, Message};
use crate::trace::TraceEvent;

pub trait Agent {
    fn id(&self) -> &AgentId;

    /// Advances the agent by one turn.
    fn step(&mut self, ctx: &mut StepContext<'_>);
}

/// An agent's view of the mailbox for the duration of one step.
///
/// The inbox can be drained once per step. Messages an agent addresses to itself
/// are held back until the step ends, so they are read on its next turn at the
/// earliest.
pub struct StepContext<'a> {
    agent: AgentId,
    tick: u64,
    mailbox: &'a mut Mailbox,
    drained: bool,
    deferred: Vec<Message>,
}

impl<'a> StepContext<'a> {
    pub fn new(agent: AgentId, tick: u64, mailbox: &'a mut Mailbox) -> Self {
        Self {
            agent,
            tick,
            mailbox,
            drained: false,
            deferred: Vec::new(),
        }
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Takes everything queued for this agent. Later calls in the same step return
    /// nothing.
    pub fn receive(&mut self) -> Vec<Message> {
        if self.drained {
            return Vec::new();
        }
        self.drained = true;
        self.mailbox.receive(&self.agent)
    }

    pub fn send(&mut self, message: Message) -> Result<(), MailboxError> {
        if message.to == self.agent {
            if !self.mailbox.is_registered(self.agent.as_str()) {
                return Err(MailboxError::UnknownRecipient {
                    from: message.from,
                    to: message.to,
                });
            }
            self.deferred.push(message);
            return Ok(());
        }
        self.mailbox.send(message)
    }

    pub fn trace(&mut self, event: TraceEvent) {
        self.mailbox.trace(event);
    }

    /// Ends the step, delivering self-addressed messages.
    pub fn finish(self) {
        let StepContext {
            agent,
            mailbox,
            deferred,
            ..
        } = self;
        for message in deferred {
            if let Err(e) = mailbox.send(message) {
                warn!(agent = %agent, error = %e, "deferred message lost");
            }
        }
    }
}

pub enum RuntimeAgent {
    Operator(OperatorAgent),
    Evaluator(EvaluatorAgent),
}

impl RuntimeAgent {
    pub fn as_evaluator(&self) -> Option<&EvaluatorAgent> {
        match self {
            RuntimeAgent::Evaluator(evaluator) => Some(evaluator),
            RuntimeAgent::Operator(_) => None,
        }
    }

    pub fn as_evaluator_mut(&mut self) -> Option<&mut EvaluatorAgent> {
        match self {
            RuntimeAgent::Evaluator(evaluator) => Some(evaluator),
            RuntimeAgent::Operator(_) => None,
        }
    }

    pub fn as_operator(&self) -> Option<&OperatorAgent> {
        match self {
            RuntimeAgent::Operator(operator) => Some(operator),
            RuntimeAgent::Evaluator(_) => None,
        }
    }
}

impl Agent for RuntimeAgent {
    fn id(&self) -> &AgentId {
        match self {
            RuntimeAgent::Operator(agent) => agent.id(),
            RuntimeAgent::Evaluator(agent) => agent.id(),
        }
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) {
        match self {
            RuntimeAgent::Operator(agent) => agent.step(ctx),
            RuntimeAgent::Evaluator(agent) => agent.step(ctx),
        }
    }
}

impl From<OperatorAgent> for RuntimeAgent {
    fn from(agent: OperatorAgent) -> Self {
        RuntimeAgent::Operator(agent)
    }
}

impl From<EvaluatorAgent> for RuntimeAgent {
    fn from(agent: EvaluatorAgent) -> Self {
        RuntimeAgent::Evaluator(agent)
    }
}
