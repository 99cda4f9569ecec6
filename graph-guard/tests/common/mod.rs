//! Shared fixtures for graph-guard integration tests.

#![allow(dead_code)]

use graph_guard::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Builds a leaf constraint with its default message.
pub fn leaf(evaluator: &str) -> ConstraintModel {
    ConstraintModel::leaf(evaluator).build().unwrap()
}

/// Builds a leaf constraint with a fixed message.
pub fn leaf_with_message(evaluator: &str, message: &str) -> ConstraintModel {
    ConstraintModel::leaf(evaluator)
        .message(message)
        .build()
        .unwrap()
}

/// Builds a leaf constraint in one group.
pub fn leaf_in(evaluator: &str, group: &str) -> ConstraintModel {
    ConstraintModel::leaf(evaluator).group(group).build().unwrap()
}

/// Wraps a single type into a validator with the built-in evaluators.
pub fn validator_for(types: Vec<TypeMetadata>) -> Validator {
    validator_with(types, GroupCatalog::new(), EvaluatorRegistry::with_builtins())
}

/// Builds a validator from types, a catalog and a registry.
pub fn validator_with(
    types: Vec<TypeMetadata>,
    catalog: GroupCatalog,
    registry: EvaluatorRegistry,
) -> Validator {
    let mut builder = MetadataIndex::builder().catalog(catalog);
    for metadata in types {
        builder = builder.register(metadata);
    }
    Validator::builder(Arc::new(builder.build().unwrap()))
        .registry(registry)
        .build()
        .unwrap()
}

/// `Profile.nickname` holds an optional-like wrapper with a container-level
/// `NotNull` ("container") and, optionally, an element-level `NotNull`
/// ("type").
pub fn optional_profile(with_element_constraint: bool) -> Validator {
    let mut element = ContainerElementMetadata::new(ContainerElementKind::Unwrapped);
    if with_element_constraint {
        element = element.constraint(leaf_with_message("NotNull", "type"));
    }
    let mut nickname =
        PropertyMetadata::new("nickname").constraint(leaf_with_message("NotNull", "container"));
    if with_element_constraint {
        nickname = nickname.element(element);
    }
    validator_for(vec![TypeMetadata::builder("Profile")
        .property(nickname)
        .build()
        .unwrap()])
}

/// Validates a `Profile` whose `nickname` is `nickname`.
pub fn validate_profile(validator: &Validator, nickname: Value) -> ViolationSet {
    let mut graph = ObjectGraph::new();
    let profile = graph.insert("Profile", [("nickname", nickname)]);
    validator
        .validate(&graph, &Value::Object(profile), &ValidationOptions::new())
        .unwrap()
}

/// `Person { name: NotBlank, age: Min(0), friends: [Person] (cascaded) }`.
pub fn person_type() -> TypeMetadata {
    TypeMetadata::builder("Person")
        .property(PropertyMetadata::new("name").constraint(leaf("NotBlank")))
        .property(
            PropertyMetadata::new("age").constraint(
                ConstraintModel::leaf("Min")
                    .param("value", 0)
                    .build()
                    .unwrap(),
            ),
        )
        .property(
            PropertyMetadata::new("friends")
                .element(ContainerElementMetadata::new(ContainerElementKind::Element).cascade()),
        )
        .build()
        .unwrap()
}

/// Inserts a person without friends.
pub fn insert_person(graph: &mut ObjectGraph, name: &str, age: i64) -> ObjectId {
    graph.insert(
        "Person",
        [
            ("name", Value::from(name)),
            ("age", Value::from(age)),
            ("friends", Value::List(Vec::new())),
        ],
    )
}

/// Sets the friends of `person`.
pub fn befriend(graph: &mut ObjectGraph, person: ObjectId, friends: &[ObjectId]) {
    let list = friends.iter().map(|id| Value::Object(*id)).collect();
    graph.set_field(person, "friends", Value::List(list));
}

/// Order / Customer / Line model used by cascade and group tests.
///
/// - `Order.customer`: `NotNull`, cascaded
/// - `Order.lines`: list, elements cascaded
/// - `Order.tags`: map whose keys are `NotBlank` and values `Size(max = 3)`
/// - `Customer.email`: `Pattern(.+@.+)`
/// - `Line.sku`: `NotBlank`; `Line.qty`: `Min(1)`
pub fn order_types() -> Vec<TypeMetadata> {
    vec![
        TypeMetadata::builder("Order")
            .property(
                PropertyMetadata::new("customer")
                    .constraint(leaf("NotNull"))
                    .cascade()
                    .bean_type("Customer"),
            )
            .property(
                PropertyMetadata::new("lines").element(
                    ContainerElementMetadata::new(ContainerElementKind::Element)
                        .cascade()
                        .bean_type("Line"),
                ),
            )
            .property(
                PropertyMetadata::new("tags")
                    .element(
                        ContainerElementMetadata::new(ContainerElementKind::MapKey)
                            .constraint(leaf("NotBlank")),
                    )
                    .element(
                        ContainerElementMetadata::new(ContainerElementKind::MapValue).constraint(
                            ConstraintModel::leaf("Size")
                                .param("max", 3)
                                .build()
                                .unwrap(),
                        ),
                    ),
            )
            .build()
            .unwrap(),
        TypeMetadata::builder("Customer")
            .property(
                PropertyMetadata::new("email").constraint(
                    ConstraintModel::leaf("Pattern")
                        .param("regexp", ".+@.+")
                        .build()
                        .unwrap(),
                ),
            )
            .build()
            .unwrap(),
        TypeMetadata::builder("Line")
            .property(PropertyMetadata::new("sku").constraint(leaf("NotBlank")))
            .property(
                PropertyMetadata::new("qty").constraint(
                    ConstraintModel::leaf("Min")
                        .param("value", 1)
                        .build()
                        .unwrap(),
                ),
            )
            .build()
            .unwrap(),
    ]
}

/// Handles to an order graph built by [`order_graph`].
pub struct OrderGraph {
    pub graph: ObjectGraph,
    pub order: ObjectId,
    pub customer: ObjectId,
    pub lines: Vec<ObjectId>,
}

/// Builds an order with one customer and the given `(sku, qty)` lines.
pub fn order_graph(email: &str, lines: &[(&str, i64)]) -> OrderGraph {
    let mut graph = ObjectGraph::new();
    let customer = graph.insert("Customer", [("email", Value::from(email))]);
    let line_ids: Vec<ObjectId> = lines
        .iter()
        .map(|(sku, qty)| graph.insert("Line", [("sku", Value::from(*sku)), ("qty", Value::from(*qty))]))
        .collect();
    let order = graph.insert(
        "Order",
        [
            ("customer", Value::Object(customer)),
            (
                "lines",
                Value::List(line_ids.iter().map(|id| Value::Object(*id)).collect()),
            ),
            ("tags", Value::Map(Vec::new())),
        ],
    );
    OrderGraph {
        graph,
        order,
        customer,
        lines: line_ids,
    }
}

/// Renders the paths of a violation set, sorted.
pub fn sorted_paths(violations: &ViolationSet) -> Vec<String> {
    let mut paths: Vec<String> = violations
        .iter()
        .map(|v| v.property_path().to_string())
        .collect();
    paths.sort();
    paths
}

/// Registry with a `Counted` evaluator that always fails and counts calls.
pub fn counting_registry(calls: Arc<AtomicUsize>) -> EvaluatorRegistry {
    EvaluatorRegistry::with_builtins().register_fn("Counted", move |_value, _params, _ctx| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    })
}
