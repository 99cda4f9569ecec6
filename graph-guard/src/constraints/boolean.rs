//! `AssertTrue` and `AssertFalse` evaluators.

use super::{unsupported, ConstraintEvaluator, EvaluationContext};
use crate::core::{Parameters, Value};
use crate::error::Result;

fn expect(id: &str, value: &Value, expected: bool) -> Result<bool> {
    match value {
        Value::Null => Ok(true),
        Value::Bool(b) => Ok(*b == expected),
        other => Err(unsupported(id, other)),
    }
}

/// Boolean must be true.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertTrueEvaluator;

impl ConstraintEvaluator for AssertTrueEvaluator {
    fn evaluate(&self, value: &Value, _: &Parameters, _: &EvaluationContext<'_>) -> Result<bool> {
        expect("AssertTrue", value, true)
    }
}

/// Boolean must be false.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertFalseEvaluator;

impl ConstraintEvaluator for AssertFalseEvaluator {
    fn evaluate(&self, value: &Value, _: &Parameters, _: &EvaluationContext<'_>) -> Result<bool> {
        expect("AssertFalse", value, false)
    }
}
