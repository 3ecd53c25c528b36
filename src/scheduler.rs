//! # Scheduler
//!
//! Owns the [`Mailbox`] and the [`AgentRegistry`] and advances the system one tick
//! at a time. A tick steps every agent exactly once, in registration order.
//!
//! Delivery takes at least one hop: a message is visible to its recipient only
//! when the recipient's own step drains its queue. That is later in the same tick
//! when the recipient is registered after the sender, otherwise the next tick.
//! Nothing blocks; an agent with nothing to do returns immediately.

use tracing::trace;

use crate::agent::{Agent, RuntimeAgent, StepContext};
use crate::agent_registry::{AgentRegistry, RegistryError};
use crate::mailbox::{Mailbox, MailboxError};
use crate::message::Message;

pub struct Scheduler<A: Agent = RuntimeAgent> {
    mailbox: Mailbox,
    registry: AgentRegistry<A>,
    ticks: u64,
}

impl<A: Agent> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new(Mailbox::new())
    }
}

impl<A: Agent> Scheduler<A> {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            registry: AgentRegistry::new(),
            ticks: 0,
        }
    }

    /// Adds an agent and opens its mailbox queue.
    pub fn register(&mut self, agent: A) -> Result<(), RegistryError> {
        let id = agent.id().clone();
        self.registry.register(agent)?;
        self.mailbox.register(id);
        Ok(())
    }

    pub fn tick(&mut self) {
        self.ticks += 1;
        self.mailbox.set_tick(self.ticks);
        trace!(tick = self.ticks, "tick");
        for agent in self.registry.iter_mut() {
            let mut ctx = StepContext::new(agent.id().clone(), self.ticks, &mut self.mailbox);
            agent.step(&mut ctx);
            ctx.finish();
        }
    }

    /// Ticks until `done` holds or `budget` ticks have run. Returns the number of
    /// ticks spent and whether `done` was reached.
    pub fn run_until<F>(&mut self, budget: u64, mut done: F) -> (u64, bool)
    where
        F: FnMut(&Self) -> bool,
    {
        let mut spent = 0;
        while spent < budget {
            if done(self) {
                return (spent, true);
            }
            self.tick();
            spent += 1;
        }
        (spent, done(self))
    }

    /// Injects a message from outside the agent set.
    pub fn post(&mut self, message: Message) -> Result<(), MailboxError> {
        self.mailbox.send(message)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn agent(&self, id: &str) -> Option<&A> {
        self.registry.get(id)
    }

    pub fn agent_mut(&mut self, id: &str) -> Option<&mut A> {
        self.registry.get_mut(id)
    }

    pub fn registry(&self) -> &AgentRegistry<A> {
        &self.registry
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}
