use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use super::*;
use crate::core::types::{MetricId, Unit};

fn transition() -> SinkEvent {
    SinkEvent::Transition(TransitionEvent {
        metric: MetricId::new("cpu.usage"),
        old_severity: Severity::Normal,
        new_severity: Severity::Warning,
        value: 88.0,
        timestamp: UNIX_EPOCH + Duration::from_secs(10),
    })
}

fn failed_action() -> SinkEvent {
    SinkEvent::Action(ActionRecord {
        kind: ActionKind::LowerPriority,
        metric: MetricId::new("cpu.usage"),
        target: "stress (4242)".to_string(),
        detail: "nice +10".to_string(),
        timestamp: UNIX_EPOCH,
        result: ActionResult::Failed("permission denied".to_string()),
    })
}

#[test]
fn test_event_serialization_is_tagged() {
    let json = serde_json::to_value(transition()).unwrap();
    assert_eq!(json["kind"], "transition");
    assert_eq!(json["new_severity"], "warning");
    assert_eq!(json["timestamp"], 10_000);

    let json = serde_json::to_value(failed_action()).unwrap();
    assert_eq!(json["kind"], "action");
    assert_eq!(json["action"], "lower_priority");
    assert_eq!(json["result"]["status"], "failed");
}

#[test]
fn test_kind_matches_tag() {
    for event in [transition(), failed_action()] {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], event.kind());
    }
}

#[test]
fn test_collecting_sink() {
    let sink = CollectingSink::new();
    sink.emit(&transition());
    sink.emit(&failed_action());

    assert_eq!(sink.len(), 2);
    assert_eq!(sink.transitions().len(), 1);
    assert_eq!(sink.actions().len(), 1);
    assert_eq!(sink.take().len(), 2);
    assert!(sink.is_empty());
}

#[test]
fn test_json_lines_sink() {
    let sink = JsonLinesSink::new(Vec::new());
    sink.emit(&transition());
    sink.emit(&SinkEvent::Reading(Reading::with_timestamp("gpu.temperature", 71.0, Unit::Celsius, "nvml", UNIX_EPOCH)));

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["kind"], "reading");
    assert_eq!(lines[1]["backend"], "nvml");
}

#[test]
fn test_json_lines_file_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    JsonLinesSink::append(&path).unwrap().emit(&transition());
    JsonLinesSink::append(&path).unwrap().emit(&failed_action());

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[tokio::test]
async fn test_broadcast_sink() {
    let sink = BroadcastSink::new(8);
    // no subscribers, dropped silently
    sink.emit(&transition());

    let mut rx = sink.subscribe();
    sink.emit(&failed_action());
    assert_eq!(rx.recv().await.unwrap(), failed_action());
}

#[test]
fn test_fanout_reaches_every_sink() {
    let first = Arc::new(CollectingSink::new());
    let second = Arc::new(CollectingSink::new());
    let fanout = FanoutSink::new().with_arc(first.clone()).with_arc(second.clone()).with(TracingSink);

    fanout.emit(&transition());
    assert_eq!(fanout.len(), 3);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}
