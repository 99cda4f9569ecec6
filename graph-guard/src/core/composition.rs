//! Boolean evaluation of composed constraints.
//!
//! A leaf invokes its evaluator. A composite combines its children:
//!
//! | Rule        | Valid when                  |
//! |-------------|-----------------------------|
//! | `AND`       | every child is valid        |
//! | `OR`        | at least one child is valid |
//! | `ALL_FALSE` | no child is valid           |
//!
//! Negation inverts the combined result. When a composite fails, the models
//! to report are either the composite itself (single-violation reporting,
//! negation, `ALL_FALSE`) or the failing children.

use super::constraint::{Composition, CompositionRule, ConstraintModel};
use super::path::PropertyPath;
use super::value::{ObjectGraph, Value};
use crate::constraints::{ClockProvider, EvaluationContext, EvaluatorRegistry};
use crate::error::{GuardError, Result};
use crate::log_constraint;
use crate::logging::LogConfig;
use std::sync::Arc;

/// Result of evaluating one constraint model against one value.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    valid: bool,
    failures: Vec<Arc<ConstraintModel>>,
}

impl Outcome {
    fn valid() -> Self {
        Self {
            valid: true,
            failures: Vec::new(),
        }
    }

    fn invalid(failures: Vec<Arc<ConstraintModel>>) -> Self {
        Self {
            valid: false,
            failures,
        }
    }

    /// Whether the constraint holds.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The models that each produce one violation. Empty when valid.
    pub fn failures(&self) -> &[Arc<ConstraintModel>] {
        &self.failures
    }

    /// Consumes the outcome and returns the failing models.
    pub fn into_failures(self) -> Vec<Arc<ConstraintModel>> {
        self.failures
    }
}

/// Evaluates constraint models with the evaluators of a registry.
#[derive(Debug, Clone, Copy)]
pub struct CompositionEvaluator<'a> {
    registry: &'a EvaluatorRegistry,
    clock: &'a dyn ClockProvider,
    log: &'a LogConfig,
}

impl<'a> CompositionEvaluator<'a> {
    /// Creates an evaluator.
    pub fn new(
        registry: &'a EvaluatorRegistry,
        clock: &'a dyn ClockProvider,
        log: &'a LogConfig,
    ) -> Self {
        Self {
            registry,
            clock,
            log,
        }
    }

    /// Evaluates `model` against `value` found at `path`.
    ///
    /// An evaluator error aborts the evaluation and is returned as an
    /// [`GuardError::EvaluatorFault`].
    pub fn evaluate(
        &self,
        model: &Arc<ConstraintModel>,
        value: &Value,
        path: &PropertyPath,
        graph: Option<&ObjectGraph>,
    ) -> Result<Outcome> {
        match model.composition() {
            Composition::Leaf(id) => {
                let evaluator =
                    self.registry
                        .get(id)
                        .ok_or_else(|| GuardError::UnknownEvaluator {
                            evaluator: id.to_string(),
                            constraint: model.name().to_string(),
                        })?;

                let ctx = EvaluationContext {
                    constraint: model,
                    path,
                    graph,
                    clock: self.clock,
                };
                let valid = evaluator
                    .evaluate(value, model.parameters(), &ctx)
                    .map_err(|e| {
                        if e.is_fault() {
                            e
                        } else {
                            GuardError::evaluator_fault_with_source(
                                id.as_str(),
                                format!("evaluation failed at '{path}'"),
                                Box::new(e),
                            )
                        }
                    })?;

                log_constraint!(
                    self.log,
                    constraint = model.name(),
                    path = %path,
                    valid,
                    "Evaluated constraint"
                );

                Ok(if valid {
                    Outcome::valid()
                } else {
                    Outcome::invalid(vec![Arc::clone(model)])
                })
            }
            Composition::Composite {
                rule,
                negate,
                children,
            } => {
                let single = model.report_as_single_violation();
                let mut child_failures = Vec::new();

                let combined = match rule {
                    CompositionRule::And => {
                        let mut all = true;
                        for child in children {
                            let outcome = self.evaluate(child, value, path, graph)?;
                            if !outcome.valid {
                                all = false;
                                child_failures.extend(outcome.failures);
                                if single {
                                    break;
                                }
                            }
                        }
                        all
                    }
                    CompositionRule::Or => {
                        let mut any = false;
                        for child in children {
                            let outcome = self.evaluate(child, value, path, graph)?;
                            if outcome.valid {
                                any = true;
                                break;
                            }
                            child_failures.extend(outcome.failures);
                        }
                        any
                    }
                    CompositionRule::AllFalse => {
                        let mut none = true;
                        for child in children {
                            if self.evaluate(child, value, path, graph)?.valid {
                                none = false;
                                break;
                            }
                        }
                        none
                    }
                };

                let valid = combined ^ *negate;
                log_constraint!(
                    self.log,
                    constraint = model.name(),
                    rule = %rule,
                    negate = *negate,
                    valid,
                    "Evaluated composition"
                );
                if valid {
                    return Ok(Outcome::valid());
                }

                let collapse = single
                    || *negate
                    || *rule == CompositionRule::AllFalse
                    || child_failures.is_empty();
                Ok(Outcome::invalid(if collapse {
                    vec![Arc::clone(model)]
                } else {
                    child_failures
                }))
            }
        }
    }
}
