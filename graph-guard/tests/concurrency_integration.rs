//! A validator and its metadata are shared across threads; every call owns
//! its own context.

mod common;

use common::*;
use graph_guard::prelude::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_calls_share_one_validator() {
    let validator = validator_for(order_types());

    let fixtures: Vec<OrderGraph> = (0..8i64)
        .map(|i| {
            let email = if i % 2 == 0 { "ok@example.com" } else { "broken" };
            let qty = i % 3;
            order_graph(email, &[("SKU", qty), ("", 1)])
        })
        .collect();

    let expected: Vec<usize> = fixtures
        .iter()
        .map(|f| {
            validator
                .validate(&f.graph, &Value::Object(f.order), &ValidationOptions::new())
                .unwrap()
                .len()
        })
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = fixtures
            .iter()
            .map(|f| {
                let validator = &validator;
                scope.spawn(move || {
                    (0..25)
                        .map(|_| {
                            validator
                                .validate(
                                    &f.graph,
                                    &Value::Object(f.order),
                                    &ValidationOptions::new(),
                                )
                                .unwrap()
                                .len()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for (handle, expected) in handles.into_iter().zip(&expected) {
            for count in handle.join().unwrap() {
                assert_eq!(count, *expected);
            }
        }
    });
}

#[test]
fn test_validator_clones_share_metadata() {
    let validator = validator_for(vec![person_type()]);
    let clone = validator.clone();
    assert!(Arc::ptr_eq(validator.metadata(), clone.metadata()));

    let mut graph = ObjectGraph::new();
    let a = insert_person(&mut graph, "", 1);
    let b = insert_person(&mut graph, "B", -3);
    befriend(&mut graph, a, &[b]);
    befriend(&mut graph, b, &[a]);
    let graph = Arc::new(graph);

    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|root| {
            let validator = validator.clone();
            let graph = Arc::clone(&graph);
            thread::spawn(move || {
                sorted_paths(
                    &validator
                        .validate(&graph, &Value::Object(root), &ValidationOptions::new())
                        .unwrap(),
                )
            })
        })
        .collect();

    let results: Vec<Vec<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], vec!["friends[0].age", "name"]);
    assert_eq!(results[1], vec!["age", "friends[0].name"]);
}
