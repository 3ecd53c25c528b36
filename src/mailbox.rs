//! # Mailbox
//!
//! One FIFO queue per registered agent. `send` appends to the recipient's queue and
//! `receive` hands the whole queue to its owner, leaving it empty, so a message is
//! read exactly once and in arrival order.
//!
//! Every transition is reported to the [`Tracer`].

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::message::{AgentId, Message};
use crate::trace::{TraceEvent, Tracer};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MailboxError {
    #[error("no mailbox for recipient '{to}' (sent by '{from}')")]
    UnknownRecipient { from: AgentId, to: AgentId },
}

#[derive(Debug, Default)]
pub struct Mailbox {
    queues: HashMap<AgentId, Vec<Message>>,
    tracer: Tracer,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracer(tracer: Tracer) -> Self {
        Self {
            queues: HashMap::new(),
            tracer,
        }
    }

    /// Opens a queue for `id`. Returns false if one already exists.
    pub fn register(&mut self, id: AgentId) -> bool {
        if self.queues.contains_key(&id) {
            return false;
        }
        self.queues.insert(id, Vec::new());
        true
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.queues.contains_key(id)
    }

    pub fn send(&mut self, message: Message) -> Result<(), MailboxError> {
        let Some(queue) = self.queues.get_mut(message.to.as_str()) else {
            return Err(MailboxError::UnknownRecipient {
                from: message.from,
                to: message.to,
            });
        };
        debug!(%message, "send");
        queue.push(message.clone());
        self.tracer.emit(TraceEvent::Sent { message });
        Ok(())
    }

    /// Drains the queue of `id` in arrival order.
    pub fn receive(&mut self, id: &AgentId) -> Vec<Message> {
        let messages = match self.queues.get_mut(id.as_str()) {
            Some(queue) => std::mem::take(queue),
            None => return Vec::new(),
        };
        for message in &messages {
            debug!(agent = %id, %message, "receive");
            self.tracer.emit(TraceEvent::Received {
                agent: id.clone(),
                message: message.clone(),
            });
        }
        messages
    }

    pub fn pending(&self, id: &str) -> usize {
        self.queues.get(id).map_or(0, Vec::len)
    }

    pub fn total_pending(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }

    pub fn set_tick(&mut self, tick: u64) {
        self.tracer.set_tick(tick);
    }

    pub fn trace(&mut self, event: TraceEvent) {
        self.tracer.emit(event);
    }

    pub fn tracer_mut(&mut self) -> &mut Tracer {
        &mut self.tracer
    }
}
