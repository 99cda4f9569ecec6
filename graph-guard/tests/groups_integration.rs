//! Integration tests for group selection: default sequences, named
//! sequences, inheritance and conversion at cascade edges.

mod common;

use common::*;
use graph_guard::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn account_type() -> TypeMetadata {
    TypeMetadata::builder("Account")
        .property(PropertyMetadata::new("name").constraint(leaf("NotBlank")))
        .property(PropertyMetadata::new("audit").constraint(leaf_in("Counted", "Expensive")))
        .default_sequence(vec![GroupId::for_type("Account"), GroupId::new("Expensive")])
        .build()
        .unwrap()
}

fn account(graph: &mut ObjectGraph, name: &str) -> ObjectId {
    graph.insert("Account", [("name", Value::from(name)), ("audit", Value::Null)])
}

#[test]
fn test_default_sequence_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validator = validator_with(
        vec![account_type()],
        GroupCatalog::new(),
        counting_registry(Arc::clone(&calls)),
    );

    let mut graph = ObjectGraph::new();
    let blank = account(&mut graph, "");
    let violations = validator
        .validate(&graph, &Value::Object(blank), &ValidationOptions::new())
        .unwrap();

    assert_eq!(sorted_paths(&violations), vec!["name"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(violations.as_slice()[0]
        .groups()
        .contains(&GroupId::for_type("Account")));
}

#[test]
fn test_default_sequence_runs_later_batches_when_clean() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validator = validator_with(
        vec![account_type()],
        GroupCatalog::new(),
        counting_registry(Arc::clone(&calls)),
    );

    let mut graph = ObjectGraph::new();
    let named = account(&mut graph, "Ada");
    let violations = validator
        .validate(&graph, &Value::Object(named), &ValidationOptions::new())
        .unwrap();

    assert_eq!(sorted_paths(&violations), vec!["audit"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(violations.as_slice()[0]
        .groups()
        .contains(&GroupId::new("Expensive")));
}

fn form_type() -> TypeMetadata {
    TypeMetadata::builder("Form")
        .property(PropertyMetadata::new("title").constraint(leaf_in("NotBlank", "Basic")))
        .property(PropertyMetadata::new("body").constraint(leaf_in("Counted", "Strict")))
        .property(PropertyMetadata::new("note").constraint(leaf("NotNull")))
        .build()
        .unwrap()
}

fn form(graph: &mut ObjectGraph, title: &str) -> ObjectId {
    graph.insert("Form", [("title", Value::from(title)), ("body", Value::from("text"))])
}

#[test]
fn test_named_sequence_stops_at_failing_batch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validator = validator_with(
        vec![form_type()],
        GroupCatalog::new().sequence("Ordered", ["Basic", "Strict"]),
        counting_registry(Arc::clone(&calls)),
    );
    let options = ValidationOptions::new().group("Ordered");

    let mut graph = ObjectGraph::new();
    let untitled = form(&mut graph, " ");
    let violations = validator
        .validate(&graph, &Value::Object(untitled), &options)
        .unwrap();
    assert_eq!(sorted_paths(&violations), vec!["title"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let titled = form(&mut graph, "Report");
    let violations = validator
        .validate(&graph, &Value::Object(titled), &options)
        .unwrap();
    assert_eq!(sorted_paths(&violations), vec!["body"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_group_inheritance() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validator = validator_with(
        vec![form_type()],
        GroupCatalog::new().extends("Strict", ["Basic"]),
        counting_registry(Arc::clone(&calls)),
    );

    let mut graph = ObjectGraph::new();
    let untitled = form(&mut graph, "");
    let root = Value::Object(untitled);

    let strict = validator
        .validate(&graph, &root, &ValidationOptions::new().group("Strict"))
        .unwrap();
    assert_eq!(sorted_paths(&strict), vec!["body", "title"]);

    let basic = validator
        .validate(&graph, &root, &ValidationOptions::new().group("Basic"))
        .unwrap();
    assert_eq!(sorted_paths(&basic), vec!["title"]);

    // `note` is missing, and it is the only Default constraint
    let default = validator
        .validate(&graph, &root, &ValidationOptions::new())
        .unwrap();
    assert_eq!(sorted_paths(&default), vec!["note"]);
}

#[test]
fn test_plain_groups_evaluated_together() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validator = validator_with(
        vec![form_type()],
        GroupCatalog::new(),
        counting_registry(Arc::clone(&calls)),
    );

    let mut graph = ObjectGraph::new();
    let untitled = form(&mut graph, "");
    let violations = validator
        .validate(
            &graph,
            &Value::Object(untitled),
            &ValidationOptions::new().groups(["Default", "Basic", "Strict"]),
        )
        .unwrap();
    assert_eq!(sorted_paths(&violations), vec!["body", "note", "title"]);
}

#[test]
fn test_group_conversion_on_cascade() {
    let validator = validator_for(vec![
        TypeMetadata::builder("Invoice")
            .property(
                PropertyMetadata::new("customer")
                    .cascade()
                    .convert_group("Default", "CustomerChecks"),
            )
            .build()
            .unwrap(),
        TypeMetadata::builder("Customer")
            .property(
                PropertyMetadata::new("email").constraint(leaf_in("NotBlank", "CustomerChecks")),
            )
            .property(PropertyMetadata::new("phone").constraint(leaf("NotBlank")))
            .build()
            .unwrap(),
    ]);

    let mut graph = ObjectGraph::new();
    let customer = graph.insert(
        "Customer",
        [("email", Value::from("")), ("phone", Value::from(""))],
    );
    let invoice = graph.insert("Invoice", [("customer", Value::Object(customer))]);

    let violations = validator
        .validate(&graph, &Value::Object(invoice), &ValidationOptions::new())
        .unwrap();
    assert_eq!(sorted_paths(&violations), vec!["customer.email"]);
    assert!(violations.as_slice()[0]
        .groups()
        .contains(&GroupId::new("CustomerChecks")));
}

#[test]
fn test_cascaded_bean_uses_its_own_default_sequence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validator = validator_with(
        vec![
            TypeMetadata::builder("Holder")
                .property(PropertyMetadata::new("item").cascade())
                .build()
                .unwrap(),
            TypeMetadata::builder("Item")
                .property(PropertyMetadata::new("name").constraint(leaf("NotBlank")))
                .property(PropertyMetadata::new("audit").constraint(leaf_in("Counted", "Deep")))
                .default_sequence(vec![GroupId::for_type("Item"), GroupId::new("Deep")])
                .build()
                .unwrap(),
        ],
        GroupCatalog::new(),
        counting_registry(Arc::clone(&calls)),
    );

    let mut graph = ObjectGraph::new();
    let blank = graph.insert("Item", [("name", Value::from(""))]);
    let holder = graph.insert("Holder", [("item", Value::Object(blank))]);
    let violations = validator
        .validate(&graph, &Value::Object(holder), &ValidationOptions::new())
        .unwrap();
    assert_eq!(sorted_paths(&violations), vec!["item.name"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let named = graph.insert("Item", [("name", Value::from("widget"))]);
    let holder = graph.insert("Holder", [("item", Value::Object(named))]);
    let violations = validator
        .validate(&graph, &Value::Object(holder), &ValidationOptions::new())
        .unwrap();
    assert_eq!(sorted_paths(&violations), vec!["item.audit"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_conflicting_sequence_markers_rejected() {
    let validator = validator_for(vec![form_type()]);
    let mut graph = ObjectGraph::new();
    let id = form(&mut graph, "x");

    let err = validator
        .validate(
            &graph,
            &Value::Object(id),
            &ValidationOptions::new().groups(["ForceFirstInSequence", "ForceLastInSequence"]),
        )
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_sequence_cycles_detected_at_index_build() {
    let err = MetadataIndex::builder()
        .catalog(GroupCatalog::new().sequence("A", ["B"]).sequence("B", ["A"]))
        .register(form_type())
        .build()
        .unwrap_err();
    assert!(matches!(err, GuardError::GroupCycle { .. }));

    let err = MetadataIndex::builder()
        .catalog(GroupCatalog::new().sequence("Loop", ["Default"]))
        .register(
            TypeMetadata::builder("Looping")
                .default_sequence(vec![GroupId::for_type("Looping"), GroupId::new("Loop")])
                .build()
                .unwrap(),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, GuardError::GroupCycle { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_default_sequence_must_name_type_group() {
    let err = TypeMetadata::builder("Orphan")
        .default_sequence(["Basic"])
        .build()
        .unwrap_err();
    assert!(err.is_configuration());
}
