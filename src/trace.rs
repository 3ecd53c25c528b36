//! # Trace Sinks
//!
//! The mailbox and the agents report every message hop and every session outcome
//! as a [`TraceRecord`]. Records go to any number of [`TraceSink`]s through a
//! [`Tracer`].
//!
//! A sink may fail (a full disk, a closed channel). The tracer logs the failure and
//! moves on; message delivery never depends on a sink.
//!
//! ```text
//! Mailbox ──send/receive──▶ Tracer ──▶ LogSink        (tracing)
//!                                 ├──▶ MemorySink     (inspection)
//!                                 ├──▶ JsonLinesSink  (file)
//!                                 └──▶ BroadcastSink  (tokio broadcast)
//! ```

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{LineWriter, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::message::{AgentId, Message};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Sent {
        message: Message,
    },
    Received {
        agent: AgentId,
        message: Message,
    },
    /// A message an agent read but did not act on.
    Dropped {
        agent: AgentId,
        message: Message,
        reason: String,
    },
    SessionStarted {
        agent: AgentId,
        expression: String,
        postfix: String,
    },
    SessionFinished {
        agent: AgentId,
        result: f64,
    },
    SessionFailed {
        agent: AgentId,
        detail: String,
        op_id: Option<Uuid>,
    },
}

impl TraceEvent {
    /// The `op_id` this event is about, if any.
    pub fn correlation_id(&self) -> Option<Uuid> {
        match self {
            TraceEvent::Sent { message }
            | TraceEvent::Received { message, .. }
            | TraceEvent::Dropped { message, .. } => Some(message.op_id()),
            TraceEvent::SessionFailed { op_id, .. } => *op_id,
            TraceEvent::SessionStarted { .. } | TraceEvent::SessionFinished { .. } => None,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Sent { message } => write!(f, "sent {}", message),
            TraceEvent::Received { agent, message } => {
                write!(f, "{} received {}", agent, message)
            }
            TraceEvent::Dropped {
                agent,
                message,
                reason,
            } => write!(f, "{} dropped {}: {}", agent, message, reason),
            TraceEvent::SessionStarted {
                agent,
                expression,
                postfix,
            } => write!(f, "{} started \"{}\" as [{}]", agent, expression, postfix),
            TraceEvent::SessionFinished { agent, result } => {
                write!(f, "{} finished with {}", agent, result)
            }
            TraceEvent::SessionFailed { agent, detail, .. } => {
                write!(f, "{} failed: {}", agent, detail)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub seq: u64,
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TraceEvent,
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sink lock poisoned")]
    Poisoned,

    #[error("Trace receiver lagged by {count} records")]
    Lagged { count: u64 },

    #[error("Trace channel closed")]
    Closed,
}

pub trait TraceSink: Send + Sync {
    fn record(&self, record: &TraceRecord) -> Result<(), TraceError>;
}

/// Fans records out to sinks, numbering them and stamping the current tick.
#[derive(Default)]
pub struct Tracer {
    sinks: Vec<Arc<dyn TraceSink>>,
    seq: u64,
    tick: u64,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("sinks", &self.sinks.len())
            .field("seq", &self.seq)
            .field("tick", &self.tick)
            .finish()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TraceSink>) {
        self.sinks.push(sink);
    }

    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn emit(&mut self, event: TraceEvent) {
        if self.sinks.is_empty() {
            return;
        }
        self.seq += 1;
        let record = TraceRecord {
            seq: self.seq,
            tick: self.tick,
            timestamp: Utc::now(),
            event,
        };
        for sink in &self.sinks {
            if let Err(e) = sink.record(&record) {
                warn!(seq = record.seq, error = %e, "trace sink rejected record");
            }
        }
    }
}

/// Mirrors records into `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&self, record: &TraceRecord) -> Result<(), TraceError> {
        tracing::debug!(
            target: "agent_calc::trace",
            seq = record.seq,
            tick = record.tick,
            "{}",
            record.event
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }

    /// Every recorded event about `op_id`, in order.
    pub fn correlated(&self, op_id: Uuid) -> Vec<TraceEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.correlation_id() == Some(op_id))
            .collect()
    }
}

impl TraceSink for MemorySink {
    fn record(&self, record: &TraceRecord) -> Result<(), TraceError> {
        self.records
            .lock()
            .map_err(|_| TraceError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

/// Appends one JSON object per record to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    writer: Mutex<LineWriter<File>>,
}

impl JsonLinesSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(LineWriter::new(file)),
        })
    }
}

impl TraceSink for JsonLinesSink {
    fn record(&self, record: &TraceRecord) -> Result<(), TraceError> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().map_err(|_| TraceError::Poisoned)?;
        writeln!(writer, "{}", line)?;
        Ok(())
    }
}

/// Publishes records on a tokio broadcast channel.
///
/// With no subscriber attached records are discarded.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<TraceRecord>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> TraceReceiver {
        TraceReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl TraceSink for BroadcastSink {
    fn record(&self, record: &TraceRecord) -> Result<(), TraceError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(record.clone())
            .map_err(|_| TraceError::Closed)?;
        Ok(())
    }
}

pub struct TraceReceiver {
    receiver: broadcast::Receiver<TraceRecord>,
}

impl TraceReceiver {
    /// Receives the next record. After a lag the receiver resubscribes and the
    /// skipped count is returned as an error; call `recv` again to continue.
    pub async fn recv(&mut self) -> Result<TraceRecord, TraceError> {
        match self.receiver.recv().await {
            Ok(record) => Ok(record),
            Err(broadcast::error::RecvError::Lagged(count)) => {
                self.receiver = self.receiver.resubscribe();
                Err(TraceError::Lagged { count })
            }
            Err(broadcast::error::RecvError::Closed) => Err(TraceError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct FailingSink;

    impl TraceSink for FailingSink {
        fn record(&self, _record: &TraceRecord) -> Result<(), TraceError> {
            Err(TraceError::Closed)
        }
    }

    fn started() -> TraceEvent {
        TraceEvent::SessionStarted {
            agent: "io".into(),
            expression: "1 + 2".to_string(),
            postfix: "1 2 +".to_string(),
        }
    }

    #[test]
    fn test_records_are_numbered_and_ticked() {
        let sink = MemorySink::new();
        let mut tracer = Tracer::new().with_sink(Arc::new(sink.clone()));
        tracer.set_tick(3);
        tracer.emit(started());
        tracer.set_tick(4);
        tracer.emit(TraceEvent::SessionFinished {
            agent: "io".into(),
            result: 3.0,
        });

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].seq, records[0].tick), (1, 3));
        assert_eq!((records[1].seq, records[1].tick), (2, 4));
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let sink = MemorySink::new();
        let mut tracer = Tracer::new()
            .with_sink(Arc::new(FailingSink))
            .with_sink(Arc::new(sink.clone()));
        tracer.emit(started());
        assert_eq!(sink.events(), vec![started()]);
    }

    #[test]
    fn test_correlation_id() {
        let op_id = Uuid::new_v4();
        let message = Message::result("sum".into(), "io".into(), 3.0, op_id);
        assert_eq!(
            TraceEvent::Sent { message }.correlation_id(),
            Some(op_id)
        );
        assert_eq!(started().correlation_id(), None);
    }

    #[test]
    fn test_record_json_is_flat() {
        let record = TraceRecord {
            seq: 7,
            tick: 2,
            timestamp: Utc::now(),
            event: TraceEvent::SessionFinished {
                agent: "io".into(),
                result: 9.0,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "session_finished");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["result"], 9.0);
        let back: TraceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let mut tracer = Tracer::new().with_sink(Arc::new(JsonLinesSink::create(&path).unwrap()));
        tracer.emit(started());
        tracer.emit(started());
        drop(tracer);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "session_started");
        assert_eq!(first["postfix"], "1 2 +");
    }

    #[tokio::test]
    async fn test_broadcast_sink() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        let mut tracer = Tracer::new().with_sink(Arc::new(sink));
        tracer.emit(started());

        let record = rx.recv().await.unwrap();
        assert_eq!(record.event, started());
    }

    #[tokio::test]
    async fn test_broadcast_lag_is_reported() {
        let sink = BroadcastSink::new(1);
        let mut rx = sink.subscribe();
        let mut tracer = Tracer::new().with_sink(Arc::new(sink));
        tracer.emit(started());
        tracer.emit(started());
        tracer.emit(started());

        assert!(matches!(rx.recv().await, Err(TraceError::Lagged { .. })));
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let sink = BroadcastSink::new(4);
        let record = TraceRecord {
            seq: 1,
            tick: 0,
            timestamp: Utc::now(),
            event: started(),
        };
        assert!(sink.record(&record).is_ok());
    }
}
