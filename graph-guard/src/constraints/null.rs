//! Presence checks: `NotNull`, `Null`, `NotBlank` and `NotEmpty`.
//!
//! An empty optional-like wrapper is a value, not null: `NotNull` accepts it.

use super::{unsupported, ConstraintEvaluator, EvaluationContext};
use crate::core::{Parameters, Value};
use crate::error::Result;

/// Value must not be null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNullEvaluator;

impl ConstraintEvaluator for NotNullEvaluator {
    fn evaluate(&self, value: &Value, _: &Parameters, _: &EvaluationContext<'_>) -> Result<bool> {
        Ok(!value.is_null())
    }
}

/// Value must be null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvaluator;

impl ConstraintEvaluator for NullEvaluator {
    fn evaluate(&self, value: &Value, _: &Parameters, _: &EvaluationContext<'_>) -> Result<bool> {
        Ok(value.is_null())
    }
}

/// Text must contain at least one non-whitespace character.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBlankEvaluator;

impl ConstraintEvaluator for NotBlankEvaluator {
    fn evaluate(&self, value: &Value, _: &Parameters, _: &EvaluationContext<'_>) -> Result<bool> {
        match value {
            Value::Null => Ok(false),
            Value::Text(s) => Ok(!s.trim().is_empty()),
            other => Err(unsupported("NotBlank", other)),
        }
    }
}

/// Text or container must have at least one element.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmptyEvaluator;

impl ConstraintEvaluator for NotEmptyEvaluator {
    fn evaluate(&self, value: &Value, _: &Parameters, _: &EvaluationContext<'_>) -> Result<bool> {
        match value {
            Value::Null => Ok(false),
            other => other
                .len()
                .map(|len| len > 0)
                .ok_or_else(|| unsupported("NotEmpty", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::super::SystemClock;
    use super::*;

    fn check(evaluator: &dyn ConstraintEvaluator, value: Value) -> bool {
        run(evaluator, &value, &Parameters::new(), &SystemClock).unwrap()
    }

    #[test]
    fn test_not_null_accepts_empty_wrapper() {
        assert!(!check(&NotNullEvaluator, Value::Null));
        assert!(check(&NotNullEvaluator, Value::none()));
        assert!(check(&NotNullEvaluator, Value::from("")));
    }

    #[test]
    fn test_null() {
        assert!(check(&NullEvaluator, Value::Null));
        assert!(!check(&NullEvaluator, Value::none()));
        assert!(!check(&NullEvaluator, Value::Int(0)));
    }

    #[test]
    fn test_not_blank() {
        assert!(!check(&NotBlankEvaluator, Value::Null));
        assert!(!check(&NotBlankEvaluator, Value::from("")));
        assert!(!check(&NotBlankEvaluator, Value::from(" \t")));
        assert!(check(&NotBlankEvaluator, Value::from("1")));

        let err = run(&NotBlankEvaluator, &Value::Int(1), &Parameters::new(), &SystemClock)
            .unwrap_err();
        assert!(err.to_string().contains("kind 'int'"));
    }

    #[test]
    fn test_not_empty() {
        assert!(!check(&NotEmptyEvaluator, Value::Null));
        assert!(!check(&NotEmptyEvaluator, Value::from("")));
        assert!(check(&NotEmptyEvaluator, Value::from(" ")));
        assert!(!check(&NotEmptyEvaluator, Value::Set(vec![])));
        assert!(check(&NotEmptyEvaluator, Value::List(vec![Value::Null])));
        assert!(!check(&NotEmptyEvaluator, Value::none()));
    }
}
