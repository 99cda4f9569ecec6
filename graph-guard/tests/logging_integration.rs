//! Tests that validation calls emit the expected structured log events.

mod common;

use common::*;
use graph_guard::prelude::*;
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CaptureWriter {
    fn events(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

fn capture<F: FnOnce()>(f: F) -> Vec<serde_json::Value> {
    let writer = CaptureWriter::default();
    let make_writer = writer.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || make_writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    writer.events()
}

fn with_message<'a>(events: &'a [serde_json::Value], message: &str) -> Vec<&'a serde_json::Value> {
    events
        .iter()
        .filter(|e| e["fields"]["message"] == message)
        .collect()
}

#[test]
fn test_completion_event_carries_counts() {
    let validator = validator_for(order_types());
    let fixture = order_graph("nope", &[("", 1)]);

    let events = capture(|| {
        let violations = validator
            .validate(
                &fixture.graph,
                &Value::Object(fixture.order),
                &ValidationOptions::new(),
            )
            .unwrap();
        assert_eq!(violations.len(), 2);
    });

    let completed = with_message(&events, "Validation completed");
    assert_eq!(completed.len(), 1);
    let fields = &completed[0]["fields"];
    assert_eq!(fields["validation.operation"], "validate");
    assert_eq!(fields["validation.root_type"], "Order");
    assert_eq!(fields["validation.violations"], 2);
    assert_eq!(completed[0]["level"], "INFO");

    let collected = with_message(&events, "Collected violation");
    assert_eq!(collected.len(), 2);
    assert!(collected
        .iter()
        .any(|e| e["fields"]["path"] == "customer.email"));
}

#[test]
fn test_production_config_silences_violation_events() {
    let validator = validator_for(order_types())
        .using_context()
        .config(ValidatorConfig::default().with_log_config(LogConfig::production()))
        .build()
        .unwrap();
    let fixture = order_graph("nope", &[]);

    let events = capture(|| {
        validator
            .validate(
                &fixture.graph,
                &Value::Object(fixture.order),
                &ValidationOptions::new(),
            )
            .unwrap();
    });

    assert!(with_message(&events, "Collected violation").is_empty());
    assert_eq!(with_message(&events, "Validation completed").len(), 1);
}

#[test]
fn test_aborted_call_logs_warning() {
    let registry = EvaluatorRegistry::with_builtins().register_fn("Broken", |_, _, _| {
        Err(GuardError::evaluator_fault("Broken", "backend down"))
    });
    let validator = validator_with(
        vec![TypeMetadata::builder("Probe")
            .property(PropertyMetadata::new("status").constraint(leaf("Broken")))
            .build()
            .unwrap()],
        GroupCatalog::new(),
        registry,
    );
    let mut graph = ObjectGraph::new();
    let probe = graph.insert("Probe", [("status", Value::from("up"))]);

    let events = capture(|| {
        assert!(validator
            .validate(&graph, &Value::Object(probe), &ValidationOptions::new())
            .is_err());
    });

    let aborted = with_message(&events, "Validation aborted");
    assert_eq!(aborted.len(), 1);
    assert_eq!(aborted[0]["level"], "WARN");
}
