//! Length checks shared by the `Size` evaluator.
//!
//! Text is measured in characters, lists, sets and maps in elements, and an
//! optional-like wrapper counts as one element when it holds a value.

use super::{unsupported, ConstraintEvaluator, EvaluationContext};
use crate::core::{Parameters, Value};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of length assertions that can be made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LengthAssertion {
    /// Length must be at least this
    Min(usize),
    /// Length must be at most this
    Max(usize),
    /// Length must be between min and max (inclusive)
    Between(usize, usize),
    /// Length must be exactly this
    Exactly(usize),
}

impl LengthAssertion {
    /// Evaluates the assertion against a length.
    pub fn evaluate(&self, len: usize) -> bool {
        match self {
            LengthAssertion::Min(min) => len >= *min,
            LengthAssertion::Max(max) => len <= *max,
            LengthAssertion::Between(min, max) => len >= *min && len <= *max,
            LengthAssertion::Exactly(expected) => len == *expected,
        }
    }

    /// Returns a human-readable description for this assertion.
    pub fn description(&self) -> String {
        match self {
            LengthAssertion::Min(min) => format!("at least {min} elements"),
            LengthAssertion::Max(max) => format!("at most {max} elements"),
            LengthAssertion::Between(min, max) => format!("between {min} and {max} elements"),
            LengthAssertion::Exactly(len) => format!("exactly {len} elements"),
        }
    }

    /// Reads `min` and `max` parameters of a `Size` constraint.
    ///
    /// Both are optional; a missing `min` is 0 and a missing `max` is
    /// unbounded. Negative values and `min > max` are rejected.
    pub fn from_parameters(parameters: &Parameters) -> Result<Self> {
        let read = |name: &str| -> Result<Option<usize>> {
            match parameters.get(name) {
                None => Ok(None),
                Some(Value::Int(i)) if *i >= 0 => Ok(Some(*i as usize)),
                Some(other) => Err(GuardError::invalid_parameter(
                    "Size",
                    name,
                    format!("expected a non-negative integer, got '{other}'"),
                )),
            }
        };

        match (read("min")?, read("max")?) {
            (None, None) => Ok(LengthAssertion::Min(0)),
            (Some(min), None) => Ok(LengthAssertion::Min(min)),
            (None, Some(max)) => Ok(LengthAssertion::Max(max)),
            (Some(min), Some(max)) if min > max => Err(GuardError::invalid_parameter(
                "Size",
                "min",
                format!("min ({min}) must not exceed max ({max})"),
            )),
            (Some(min), Some(max)) if min == max => Ok(LengthAssertion::Exactly(min)),
            (Some(min), Some(max)) => Ok(LengthAssertion::Between(min, max)),
        }
    }
}

impl fmt::Display for LengthAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Length of text, collections and wrappers must satisfy `min`..=`max`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeEvaluator;

impl ConstraintEvaluator for SizeEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        if value.is_null() {
            return Ok(true);
        }
        let len = value.len().ok_or_else(|| unsupported("Size", value))?;
        Ok(LengthAssertion::from_parameters(parameters)?.evaluate(len))
    }

    fn check_parameters(&self, parameters: &Parameters) -> Result<()> {
        LengthAssertion::from_parameters(parameters).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{params, run};
    use super::super::SystemClock;
    use super::*;

    #[test]
    fn test_length_assertion_evaluate() {
        assert!(LengthAssertion::Min(2).evaluate(2));
        assert!(!LengthAssertion::Max(2).evaluate(3));
        assert!(LengthAssertion::Between(1, 3).evaluate(3));
        assert!(!LengthAssertion::Exactly(4).evaluate(3));
    }

    #[test]
    fn test_from_parameters() {
        let p = params(&[("min", Value::Int(2)), ("max", Value::Int(2))]);
        assert_eq!(
            LengthAssertion::from_parameters(&p).unwrap(),
            LengthAssertion::Exactly(2)
        );

        assert_eq!(
            LengthAssertion::from_parameters(&Parameters::new()).unwrap(),
            LengthAssertion::Min(0)
        );
        assert_eq!(
            LengthAssertion::from_parameters(&params(&[("max", Value::Int(4))])).unwrap(),
            LengthAssertion::Max(4)
        );

        let bad = params(&[("min", Value::Int(-1))]);
        let err = LengthAssertion::from_parameters(&bad).unwrap_err();
        assert!(matches!(err, GuardError::InvalidParameter { .. }));

        let inverted = params(&[("min", Value::Int(5)), ("max", Value::Int(1))]);
        assert!(LengthAssertion::from_parameters(&inverted).is_err());
    }

    #[test]
    fn test_size_on_text_and_collections() {
        let p = params(&[("min", Value::Int(1)), ("max", Value::Int(3))]);
        assert!(run(&SizeEvaluator, &Value::from("abc"), &p, &SystemClock).unwrap());
        assert!(!run(&SizeEvaluator, &Value::from("abcd"), &p, &SystemClock).unwrap());
        assert!(!run(&SizeEvaluator, &Value::List(vec![]), &p, &SystemClock).unwrap());
        assert!(run(&SizeEvaluator, &Value::Null, &p, &SystemClock).unwrap());
        assert!(run(
            &SizeEvaluator,
            &Value::Map(vec![(Value::from("k"), Value::Int(1))]),
            &p,
            &SystemClock
        )
        .unwrap());
    }

    #[test]
    fn test_size_on_number_is_fault() {
        let err = run(&SizeEvaluator, &Value::Int(4), &Parameters::new(), &SystemClock).unwrap_err();
        assert!(err.is_fault());
    }

    #[test]
    fn test_description() {
        assert_eq!(
            LengthAssertion::Between(1, 3).to_string(),
            "between 1 and 3 elements"
        );
        assert_eq!(LengthAssertion::Exactly(2).to_string(), "exactly 2 elements");
        assert_eq!(LengthAssertion::Min(1).to_string(), "at least 1 elements");
    }
}
