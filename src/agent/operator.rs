use tracing::{debug, warn};

use super::{Agent, StepContext};
use crate::message::{AgentId, Message, MessageBody};
use crate::tokenizer::Operator;
use crate::trace::TraceEvent;

/// Serves compute requests for a single operator.
///
/// Holds no session state, so one instance serves every evaluator for the life of
/// the process. Each `Compute` message gets exactly one reply carrying the request's
/// `op_id`: a `Result`, or an `Error` when the operator faults.
#[derive(Debug, Clone)]
pub struct OperatorAgent {
    id: AgentId,
    operator: Operator,
    served: u64,
}

impl OperatorAgent {
    /// An agent registered under the operator's well-known id.
    pub fn new(operator: Operator) -> Self {
        Self::with_id(operator.agent_id(), operator)
    }

    pub fn with_id(id: AgentId, operator: Operator) -> Self {
        Self {
            id,
            operator,
            served: 0,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Number of compute requests answered so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    fn answer(&self, request: &Message, a: f64, b: f64, op_id: uuid::Uuid) -> Message {
        let body = match self.operator.apply(a, b) {
            Ok(result) => MessageBody::Result { result, op_id },
            Err(fault) => {
                debug!(agent = %self.id, %fault, "compute fault");
                MessageBody::Error {
                    detail: fault.to_string(),
                    op_id,
                }
            }
        };
        request.reply(body)
    }
}

impl Agent for OperatorAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) {
        for message in ctx.receive() {
            let MessageBody::Compute { a, b, op_id } = message.body else {
                warn!(agent = %self.id, %message, "operator agents only serve compute requests");
                ctx.trace(TraceEvent::Dropped {
                    agent: self.id.clone(),
                    reason: format!("unexpected {} message", message.message_type()),
                    message,
                });
                continue;
            };
            let reply = self.answer(&message, a, b, op_id);
            self.served += 1;
            if let Err(e) = ctx.send(reply) {
                warn!(agent = %self.id, error = %e, "reply undeliverable");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::mailbox::Mailbox;

    fn step(agent: &mut OperatorAgent, mailbox: &mut Mailbox) {
        let mut ctx = StepContext::new(agent.id().clone(), 1, mailbox);
        agent.step(&mut ctx);
        ctx.finish();
    }

    fn setup(operator: Operator) -> (OperatorAgent, Mailbox) {
        let agent = OperatorAgent::new(operator);
        let mut mailbox = Mailbox::new();
        mailbox.register("io".into());
        mailbox.register(agent.id().clone());
        (agent, mailbox)
    }

    #[test]
    fn test_result_echoes_op_id() {
        let (mut agent, mut mailbox) = setup(Operator::Sub);
        let op_id = Uuid::new_v4();
        mailbox
            .send(Message::compute("io".into(), "sub".into(), 10.0, 4.0, op_id))
            .unwrap();

        step(&mut agent, &mut mailbox);

        let replies = mailbox.receive(&"io".into());
        assert_eq!(
            replies,
            vec![Message::result("sub".into(), "io".into(), 6.0, op_id)]
        );
        assert_eq!(agent.served(), 1);
    }

    #[test]
    fn test_division_by_zero_is_an_error_reply() {
        let (mut agent, mut mailbox) = setup(Operator::Div);
        let op_id = Uuid::new_v4();
        mailbox
            .send(Message::compute("io".into(), "div".into(), 4.0, 0.0, op_id))
            .unwrap();

        step(&mut agent, &mut mailbox);

        let replies = mailbox.receive(&"io".into());
        assert_eq!(replies.len(), 1);
        match &replies[0].body {
            MessageBody::Error { detail, op_id: id } => {
                assert!(detail.contains("division by zero"));
                assert_eq!(*id, op_id);
            }
            other => panic!("expected an error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_one_reply_per_request_in_order() {
        let (mut agent, mut mailbox) = setup(Operator::Pow);
        let ids: Vec<_> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (i, op_id) in ids.iter().enumerate() {
            mailbox
                .send(Message::compute("io".into(), "pow".into(), 2.0, i as f64, *op_id))
                .unwrap();
        }

        step(&mut agent, &mut mailbox);

        let replies = mailbox.receive(&"io".into());
        let echoed: Vec<_> = replies.iter().map(Message::op_id).collect();
        assert_eq!(echoed, ids);
        let values: Vec<_> = replies
            .iter()
            .filter_map(|m| match m.body {
                MessageBody::Result { result, .. } => Some(result),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_non_compute_messages_are_ignored() {
        let (mut agent, mut mailbox) = setup(Operator::Add);
        mailbox
            .send(Message::result("io".into(), "sum".into(), 1.0, Uuid::new_v4()))
            .unwrap();

        step(&mut agent, &mut mailbox);

        assert_eq!(mailbox.pending("io"), 0);
        assert_eq!(agent.served(), 0);
    }
}
