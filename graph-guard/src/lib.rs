//! # graph-guard - Object Graph Validation for Rust
//!
//! graph-guard validates graphs of objects against declarative constraint
//! metadata: constraints attached to types, properties and container elements,
//! composed with boolean rules, selected by validation groups and cascaded into
//! referenced objects.
//!
//! ## Overview
//!
//! Metadata is built once into an immutable [`MetadataIndex`](core::MetadataIndex)
//! and shared by every [`Validator`](core::Validator). A validation call walks
//! the graph synchronously and returns a [`ViolationSet`](core::ViolationSet).
//! Violations are data, not errors: a call either succeeds with a (possibly
//! empty) set of violations or fails with a [`GuardError`](error::GuardError).
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_guard::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> graph_guard::error::Result<()> {
//! // Declare what a valid Person looks like
//! let person = TypeMetadata::builder("Person")
//!     .property(
//!         PropertyMetadata::new("name")
//!             .constraint(ConstraintModel::leaf("NotBlank").build()?)
//!             .constraint(ConstraintModel::leaf("Size").param("max", 20).build()?),
//!     )
//!     .property(
//!         PropertyMetadata::new("age")
//!             .constraint(ConstraintModel::leaf("Min").param("value", 0).build()?),
//!     )
//!     .property(
//!         PropertyMetadata::new("friends")
//!             .element(ContainerElementMetadata::new(ContainerElementKind::Element).cascade()),
//!     )
//!     .build()?;
//!
//! let index = Arc::new(MetadataIndex::builder().register(person).build()?);
//! let validator = Validator::builder(index).build()?;
//!
//! // Build a graph; cycles are fine
//! let mut graph = ObjectGraph::new();
//! let ada = graph.insert("Person", [("name", Value::from("Ada")), ("age", Value::from(36))]);
//! let bob = graph.insert("Person", [("name", Value::from("")), ("age", Value::from(-1))]);
//! graph.set_field(ada, "friends", Value::List(vec![Value::Object(bob)]));
//! graph.set_field(bob, "friends", Value::List(vec![Value::Object(ada)]));
//!
//! let violations = validator.validate(&graph, &Value::Object(ada), &ValidationOptions::new())?;
//! assert_eq!(violations.len(), 2);
//! for violation in &violations {
//!     println!("{violation}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! ### Constraints
//!
//! - **Built-in evaluators**: `NotNull`, `NotBlank`, `Size`, `Min`, `Pattern`,
//!   `Past`, and more (see [`constraints`])
//! - **Composition**: `AND`, `OR` and `ALL_FALSE` with negation and
//!   single-violation reporting
//! - **Custom evaluators**: any [`ConstraintEvaluator`](constraints::ConstraintEvaluator)
//!   or closure registered in an [`EvaluatorRegistry`](constraints::EvaluatorRegistry)
//!
//! ### Groups
//!
//! Constraints belong to groups. Groups may extend other groups, named
//! sequences run their groups in order and stop at the first failing one, and
//! a type may redefine what `Default` means for it.
//!
//! ### Observability
//!
//! - Structured logging with the `tracing` crate, gated by [`LogConfig`](logging::LogConfig)
//! - Optional OpenTelemetry spans behind the `telemetry` feature
//!
//! ```rust,ignore
//! use graph_guard::telemetry::GuardTelemetry;
//!
//! // Bring your own tracer
//! let tracer = opentelemetry::global::tracer("order-service");
//! let telemetry = GuardTelemetry::new(tracer).with_detailed_spans(true);
//! let validator = Validator::builder(index).telemetry(telemetry).build()?;
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: object graph, metadata, group resolution, traversal and the
//!   [`Validator`](core::Validator) entry points
//! - **`constraints`**: the evaluator trait, registry and built-in evaluators
//! - **`formatters`**: JSON, human and Markdown rendering of violations
//! - **`logging`** / **`telemetry`**: observability
//! - **`error`**: the [`GuardError`](error::GuardError) taxonomy

pub mod constraints;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod telemetry;
