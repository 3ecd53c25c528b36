//! # Messages
//!
//! Agents never call each other. Every interaction is a [`Message`] routed by the
//! [`crate::mailbox::Mailbox`] to the queue of its `to` agent.
//!
//! | type      | payload                    |
//! |-----------|----------------------------|
//! | `Compute` | `a`, `b`, `op_id`          |
//! | `Result`  | `result`, `op_id`          |
//! | `Error`   | `detail`, `op_id`          |
//!
//! `op_id` is generated per compute request and is the only correlation key between
//! a request and its response.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Identity of a registered agent; also its mailbox address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum MessageType {
    Compute,
    Result,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MessageBody {
    Compute { a: f64, b: f64, op_id: Uuid },
    Result { result: f64, op_id: Uuid },
    Error { detail: String, op_id: Uuid },
}

impl MessageBody {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageBody::Compute { .. } => MessageType::Compute,
            MessageBody::Result { .. } => MessageType::Result,
            MessageBody::Error { .. } => MessageType::Error,
        }
    }

    pub fn op_id(&self) -> Uuid {
        match self {
            MessageBody::Compute { op_id, .. }
            | MessageBody::Result { op_id, .. }
            | MessageBody::Error { op_id, .. } => *op_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: AgentId,
    pub to: AgentId,
    pub body: MessageBody,
}

impl Message {
    pub fn new(from: AgentId, to: AgentId, body: MessageBody) -> Self {
        Self { from, to, body }
    }

    pub fn compute(from: AgentId, to: AgentId, a: f64, b: f64, op_id: Uuid) -> Self {
        Self::new(from, to, MessageBody::Compute { a, b, op_id })
    }

    pub fn result(from: AgentId, to: AgentId, result: f64, op_id: Uuid) -> Self {
        Self::new(from, to, MessageBody::Result { result, op_id })
    }

    pub fn error(from: AgentId, to: AgentId, detail: impl Into<String>, op_id: Uuid) -> Self {
        Self::new(
            from,
            to,
            MessageBody::Error {
                detail: detail.into(),
                op_id,
            },
        )
    }

    /// Builds a message travelling back to the sender of `self`.
    pub fn reply(&self, body: MessageBody) -> Self {
        Self::new(self.to.clone(), self.from.clone(), body)
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    pub fn op_id(&self) -> Uuid {
        self.body.op_id()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.message_type(), self.from, self.to)?;
        match &self.body {
            MessageBody::Compute { a, b, op_id } => write!(f, " ({}, {}) [{}]", a, b, op_id),
            MessageBody::Result { result, op_id } => write!(f, " {} [{}]", result, op_id),
            MessageBody::Error { detail, op_id } => write!(f, " \"{}\" [{}]", detail, op_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_reply_swaps_addresses() {
        let op_id = Uuid::new_v4();
        let request = Message::compute("io".into(), "sum".into(), 1.0, 2.0, op_id);
        let reply = request.reply(MessageBody::Result {
            result: 3.0,
            op_id,
        });
        assert_eq!(reply.from, AgentId::new("sum"));
        assert_eq!(reply.to, AgentId::new("io"));
        assert_eq!(reply.op_id(), op_id);
        assert_eq!(reply.message_type(), MessageType::Result);
    }

    #[test]
    fn test_wire_shape() {
        let op_id = Uuid::nil();
        let message = Message::error("div".into(), "io".into(), "division by zero", op_id);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from": "div",
                "to": "io",
                "body": {
                    "type": "Error",
                    "payload": {
                        "detail": "division by zero",
                        "op_id": "00000000-0000-0000-0000-000000000000"
                    }
                }
            })
        );
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }
}
