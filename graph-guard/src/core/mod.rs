//! Core validation types for the graph-guard engine.
//!
//! This module provides the data model of an object graph, the constraint
//! metadata attached to types, and the engine that walks a graph and turns
//! failed constraints into violations.
//!
//! ## Overview
//!
//! - **[`ObjectGraph`]** / **[`Value`]**: the data being validated. Objects live
//!   in an arena and reference each other by [`ObjectId`], so cyclic graphs are
//!   ordinary.
//! - **[`ConstraintModel`]**: one constraint occurrence, a leaf evaluator call
//!   or a boolean composition of children.
//! - **[`TypeMetadata`]**: the constraints, properties, container elements and
//!   cascades declared on a type, indexed by a [`MetadataIndex`].
//! - **[`GroupCatalog`]** and **[`GroupResolver`]**: which constraints run, and
//!   in which order.
//! - **[`Validator`]**: the entry points `validate`, `validate_property` and
//!   `validate_value`, each returning a [`ViolationSet`].
//!
//! ## Architecture
//!
//! ```text
//! Validator
//!     ├── GroupResolver ──> ValidationPlan (batches, sequences)
//!     └── per batch: traversal
//!         ├── bean constraints
//!         ├── property constraints ── container elements
//!         ├── cascades (cycle-guarded) ──> nested beans
//!         └── CompositionEvaluator ──> ViolationCollector
//! ```
//!
//! ## Example
//!
//! ```rust
//! use graph_guard::core::*;
//! use std::sync::Arc;
//!
//! # fn main() -> graph_guard::error::Result<()> {
//! let index = MetadataIndex::builder()
//!     .register(
//!         TypeMetadata::builder("Order")
//!             .property(
//!                 PropertyMetadata::new("customer")
//!                     .constraint(ConstraintModel::leaf("NotNull").build()?)
//!                     .cascade(),
//!             )
//!             .build()?,
//!     )
//!     .register(
//!         TypeMetadata::builder("Customer")
//!             .property(
//!                 PropertyMetadata::new("email").constraint(
//!                     ConstraintModel::leaf("Pattern")
//!                         .param("regexp", r"[^@]+@[^@]+")
//!                         .build()?,
//!                 ),
//!             )
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let validator = Validator::builder(Arc::new(index)).build()?;
//!
//! let mut graph = ObjectGraph::new();
//! let customer = graph.insert("Customer", [("email", Value::from("nope"))]);
//! let order = graph.insert("Order", [("customer", Value::Object(customer))]);
//!
//! let violations = validator.validate(&graph, &Value::Object(order), &ValidationOptions::new())?;
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations.as_slice()[0].property_path().to_string(), "customer.email");
//! # Ok(())
//! # }
//! ```

mod accessor;
mod collector;
mod composition;
mod constraint;
mod group;
mod interpolator;
mod location;
mod metadata;
mod path;
mod resolver;
mod traversable;
mod traversal;
pub mod validation_context;
mod validator;
mod value;
mod violation;

pub use accessor::{AccessorTable, FieldAccessor, PropertyAccessor};
pub use collector::ViolationCollector;
pub use composition::{CompositionEvaluator, Outcome};
pub use constraint::{
    Composition, CompositionRule, ConstraintModel, ConstraintModelBuilder, Parameters,
};
pub use group::{GroupCatalog, GroupId, GroupSet};
pub use interpolator::{Locale, MessageInterpolator, ParameterMessageInterpolator};
pub use location::{
    ContainerElementKind, ContainerElementMetadata, LocationDescriptor, LocationKey, LocationKind,
    PropertyMetadata, TypeMetadata, TypeMetadataBuilder,
};
pub use metadata::{MetadataIndex, MetadataIndexBuilder, MetadataProvider};
pub use path::{PathSegment, PropertyPath};
pub use resolver::{GroupResolver, PlanStep, ValidationPlan};
pub use traversable::{ExcludeProperties, TraversableResolver, TraverseAll};
pub use validation_context::ValidationContext;
pub use validator::{ValidationOptions, Validator, ValidatorBuilder, ValidatorConfig};
pub use value::{Object, ObjectGraph, ObjectId, TypeName, Value};
pub use violation::{Violation, ViolationSet};
