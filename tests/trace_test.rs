use std::sync::Arc;

use agent_calc::{
    config::TraceConfig,
    trace::{BroadcastSink, TraceEvent, Tracer},
    CalcConfig, Calculator, Outcome,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use uuid::Uuid;

fn read_records(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_json_lines_trace_of_a_failed_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let config = CalcConfig {
        trace: TraceConfig {
            log_events: false,
            file: Some(path.clone()),
        },
        ..CalcConfig::default()
    };

    let mut calc = Calculator::new(&config).unwrap();
    let report = calc.evaluate("4 / 0").unwrap();
    assert!(matches!(report.outcome, Outcome::Failed(_)));
    drop(calc);

    let records = read_records(&path);
    let events: Vec<&str> = records
        .iter()
        .map(|r| r["event"].as_str().unwrap())
        .collect();
    assert_eq!(
        events,
        vec![
            "session_started",
            "sent",
            "received",
            "sent",
            "received",
            "session_failed",
        ]
    );

    let seqs: Vec<u64> = records.iter().map(|r| r["seq"].as_u64().unwrap()).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));

    // Every hop of the failing request carries the op id the failure reports.
    let op_id = records[5]["op_id"].as_str().unwrap();
    Uuid::parse_str(op_id).unwrap();
    for record in &records[1..5] {
        assert_eq!(record["message"]["body"]["payload"]["op_id"], op_id);
    }
    assert_eq!(records[1]["message"]["to"], "div");
    assert_eq!(records[1]["message"]["body"]["type"], "Compute");
    assert_eq!(records[3]["message"]["body"]["type"], "Error");
    assert!(records[5]["detail"]
        .as_str()
        .unwrap()
        .contains("division by zero"));
}

#[test]
fn test_trace_file_is_appended_across_calculators() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let config = CalcConfig {
        trace: TraceConfig {
            log_events: false,
            file: Some(path.clone()),
        },
        ..CalcConfig::default()
    };

    Calculator::new(&config).unwrap().evaluate("1").unwrap();
    let first = read_records(&path).len();
    Calculator::new(&config).unwrap().evaluate("1").unwrap();
    assert_eq!(read_records(&path).len(), first * 2);
}

#[tokio::test]
async fn test_broadcast_subscriber_sees_the_session() {
    let sink = BroadcastSink::new(64);
    let mut receiver = sink.subscribe();
    let tracer = Tracer::new().with_sink(Arc::new(sink));
    let mut calc = Calculator::with_tracer(&CalcConfig::default(), tracer).unwrap();

    calc.evaluate("6 * 7").unwrap();

    let mut events = Vec::new();
    loop {
        let record = receiver.recv().await.unwrap();
        let last = matches!(record.event, TraceEvent::SessionFinished { .. });
        events.push(record.event);
        if last {
            break;
        }
    }
    assert!(matches!(events.first(), Some(TraceEvent::SessionStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(TraceEvent::SessionFinished { result, .. }) if *result == 42.0
    ));
}
