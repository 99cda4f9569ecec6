//! Constraint evaluators and the registry that dispatches to them.
//!
//! A leaf [`ConstraintModel`](crate::core::ConstraintModel) names an
//! [`EvaluatorId`]; at validation time the engine looks the id up in an
//! [`EvaluatorRegistry`] and calls [`ConstraintEvaluator::evaluate`] with the
//! value at the constrained location.
//!
//! ## Built-in evaluators
//!
//! | Id | Accepts null | Checks |
//! |----|--------------|--------|
//! | `NotNull` | no | value is not null |
//! | `Null` | yes | value is null |
//! | `NotBlank` | no | text has a non-whitespace character |
//! | `NotEmpty` | no | text, list, set, map or wrapper is non-empty |
//! | `Size` | yes | length within `min`..=`max` |
//! | `Min` / `Max` | yes | number compared with `value` |
//! | `Range` | yes | number within `min`..=`max` |
//! | `Pattern` | yes | text fully matches `regexp` |
//! | `AssertTrue` / `AssertFalse` | yes | boolean is true / false |
//! | `Past`, `PastOrPresent`, `Future`, `FutureOrPresent` | yes | timestamp relative to the clock |
//!
//! ## Custom evaluators
//!
//! ```rust
//! use graph_guard::constraints::EvaluatorRegistry;
//! use graph_guard::core::Value;
//!
//! let registry = EvaluatorRegistry::with_builtins()
//!     .register_fn("Even", |value, _params, _ctx| {
//!         Ok(match value {
//!             Value::Int(i) => i % 2 == 0,
//!             _ => true,
//!         })
//!     });
//!
//! assert!(registry.contains("Even"));
//! assert!(registry.contains("NotNull"));
//! ```

mod assertion;
mod boolean;
mod length;
mod null;
mod numeric;
mod pattern;
mod temporal;

pub use assertion::Assertion;
pub use boolean::{AssertFalseEvaluator, AssertTrueEvaluator};
pub use length::{LengthAssertion, SizeEvaluator};
pub use null::{NotBlankEvaluator, NotEmptyEvaluator, NotNullEvaluator, NullEvaluator};
pub use numeric::{MaxEvaluator, MinEvaluator, RangeEvaluator};
pub use pattern::PatternEvaluator;
pub use temporal::{TemporalDirection, TemporalEvaluator};

use crate::core::{ConstraintModel, ObjectGraph, Parameters, PropertyPath, Value};
use crate::error::{GuardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of an evaluator in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluatorId(Arc<str>);

impl EvaluatorId {
    /// Creates an evaluator id.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvaluatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EvaluatorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EvaluatorId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Source of the current time for temporal evaluators.
pub trait ClockProvider: fmt::Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockProvider for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl ClockProvider for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// What an evaluator can see besides the value it checks.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// The leaf constraint being evaluated
    pub constraint: &'a ConstraintModel,
    /// Path of the value being checked
    pub path: &'a PropertyPath,
    /// Graph the value belongs to; `None` for `validate_value`
    pub graph: Option<&'a ObjectGraph>,
    /// Clock for temporal checks
    pub clock: &'a dyn ClockProvider,
}

/// A pluggable constraint implementation.
///
/// Evaluators are stateless with respect to a validation call and must be
/// safe to call from several threads at once.
pub trait ConstraintEvaluator: fmt::Debug + Send + Sync {
    /// Returns true if `value` satisfies the constraint.
    ///
    /// An `Err` is a fault: it aborts the whole validation call and is never
    /// turned into a violation.
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool>;

    /// Checks the parameters of a constraint using this evaluator.
    ///
    /// Called once per constraint when a validator is built.
    fn check_parameters(&self, _parameters: &Parameters) -> Result<()> {
        Ok(())
    }
}

type EvaluatorFn =
    dyn Fn(&Value, &Parameters, &EvaluationContext<'_>) -> Result<bool> + Send + Sync;

/// Adapter that turns a closure into a [`ConstraintEvaluator`].
pub struct FnEvaluator {
    id: EvaluatorId,
    f: Box<EvaluatorFn>,
}

impl fmt::Debug for FnEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator").field("id", &self.id).finish()
    }
}

impl ConstraintEvaluator for FnEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        (self.f)(value, parameters, ctx)
    }
}

/// Evaluators by id.
///
/// The registry is cheap to clone: evaluators are shared behind `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<EvaluatorId, Arc<dyn ConstraintEvaluator>>,
}

impl EvaluatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in evaluator.
    pub fn with_builtins() -> Self {
        Self::new()
            .register("NotNull", NotNullEvaluator)
            .register("Null", NullEvaluator)
            .register("NotBlank", NotBlankEvaluator)
            .register("NotEmpty", NotEmptyEvaluator)
            .register("Size", SizeEvaluator)
            .register("Min", MinEvaluator)
            .register("Max", MaxEvaluator)
            .register("Range", RangeEvaluator)
            .register("Pattern", PatternEvaluator::new())
            .register("AssertTrue", AssertTrueEvaluator)
            .register("AssertFalse", AssertFalseEvaluator)
            .register("Past", TemporalEvaluator::new(TemporalDirection::Past))
            .register(
                "PastOrPresent",
                TemporalEvaluator::new(TemporalDirection::PastOrPresent),
            )
            .register("Future", TemporalEvaluator::new(TemporalDirection::Future))
            .register(
                "FutureOrPresent",
                TemporalEvaluator::new(TemporalDirection::FutureOrPresent),
            )
    }

    /// Registers (or replaces) an evaluator.
    pub fn register(
        mut self,
        id: impl Into<EvaluatorId>,
        evaluator: impl ConstraintEvaluator + 'static,
    ) -> Self {
        self.evaluators.insert(id.into(), Arc::new(evaluator));
        self
    }

    /// Registers (or replaces) a closure evaluator.
    pub fn register_fn<F>(self, id: impl Into<EvaluatorId>, f: F) -> Self
    where
        F: Fn(&Value, &Parameters, &EvaluationContext<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        let id = id.into();
        let evaluator = FnEvaluator {
            id: id.clone(),
            f: Box::new(f),
        };
        self.register(id, evaluator)
    }

    /// Looks up an evaluator.
    pub fn get(&self, id: &EvaluatorId) -> Option<&Arc<dyn ConstraintEvaluator>> {
        self.evaluators.get(id)
    }

    /// Returns true if an evaluator is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.evaluators.contains_key(&EvaluatorId::from(id))
    }

    /// Number of registered evaluators.
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    /// Returns true if no evaluator is registered.
    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

/// Fault raised when an evaluator meets a value kind it does not support.
pub(crate) fn unsupported(evaluator: &str, value: &Value) -> GuardError {
    GuardError::evaluator_fault(
        evaluator,
        format!("cannot validate a value of kind '{}'", value.kind()),
    )
}
