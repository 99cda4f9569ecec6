//! `Min`, `Max` and `Range` evaluators.

use super::{unsupported, Assertion, ConstraintEvaluator, EvaluationContext, EvaluatorId};
use crate::core::{Parameters, Value};
use crate::error::Result;

fn check(id: &str, value: &Value, parameters: &Parameters) -> Result<bool> {
    if value.is_null() {
        return Ok(true);
    }
    let assertion = Assertion::from_parameters(&EvaluatorId::from(id), parameters)?;
    match value {
        Value::Int(i) => Ok(assertion.evaluate_integer(*i)),
        Value::Float(x) => Ok(!x.is_nan() && assertion.evaluate(*x)),
        // text that does not parse is invalid, not a fault
        Value::Text(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(assertion.evaluate_integer(i));
            }
            Ok(s.parse::<f64>()
                .map_or(false, |x| !x.is_nan() && assertion.evaluate(x)))
        }
        other => Err(unsupported(id, other)),
    }
}

/// Number must be at least `value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinEvaluator;

impl ConstraintEvaluator for MinEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        check("Min", value, parameters)
    }

    fn check_parameters(&self, parameters: &Parameters) -> Result<()> {
        Assertion::from_parameters(&EvaluatorId::from("Min"), parameters).map(|_| ())
    }
}

/// Number must be at most `value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxEvaluator;

impl ConstraintEvaluator for MaxEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        check("Max", value, parameters)
    }

    fn check_parameters(&self, parameters: &Parameters) -> Result<()> {
        Assertion::from_parameters(&EvaluatorId::from("Max"), parameters).map(|_| ())
    }
}

/// Number must be within `min`..=`max`; a missing bound is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeEvaluator;

impl ConstraintEvaluator for RangeEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        check("Range", value, parameters)
    }

    fn check_parameters(&self, parameters: &Parameters) -> Result<()> {
        Assertion::from_parameters(&EvaluatorId::from("Range"), parameters).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{params, run};
    use super::super::SystemClock;
    use super::*;

    #[test]
    fn test_min() {
        let p = params(&[("value", Value::Int(10))]);
        assert!(run(&MinEvaluator, &Value::Int(10), &p, &SystemClock).unwrap());
        assert!(!run(&MinEvaluator, &Value::Float(9.5), &p, &SystemClock).unwrap());
        assert!(run(&MinEvaluator, &Value::Null, &p, &SystemClock).unwrap());
        assert!(run(&MinEvaluator, &Value::from("12"), &p, &SystemClock).unwrap());
        assert!(!run(&MinEvaluator, &Value::from("twelve"), &p, &SystemClock).unwrap());
    }

    #[test]
    fn test_max_and_range() {
        let p = params(&[("value", Value::Int(3))]);
        assert!(run(&MaxEvaluator, &Value::Int(3), &p, &SystemClock).unwrap());
        assert!(!run(&MaxEvaluator, &Value::Int(4), &p, &SystemClock).unwrap());

        let r = params(&[("min", Value::Int(1))]);
        assert!(run(&RangeEvaluator, &Value::Int(1_000_000), &r, &SystemClock).unwrap());
        assert!(!run(&RangeEvaluator, &Value::Int(0), &r, &SystemClock).unwrap());
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        // 2^53 + 1 rounds to 2^53 as f64
        let p = params(&[("value", Value::Int(9_007_199_254_740_993))]);
        assert!(!run(&MinEvaluator, &Value::Int(9_007_199_254_740_992), &p, &SystemClock).unwrap());
        assert!(run(&MinEvaluator, &Value::Int(9_007_199_254_740_993), &p, &SystemClock).unwrap());
        assert!(!run(&MinEvaluator, &Value::from("9007199254740992"), &p, &SystemClock).unwrap());

        let p = params(&[("value", Value::Int(9_007_199_254_740_992))]);
        assert!(!run(&MaxEvaluator, &Value::Int(9_007_199_254_740_993), &p, &SystemClock).unwrap());

        let r = params(&[("min", Value::Int(i64::MAX - 1)), ("max", Value::Int(i64::MAX - 1))]);
        assert!(run(&RangeEvaluator, &Value::Int(i64::MAX - 1), &r, &SystemClock).unwrap());
        assert!(!run(&RangeEvaluator, &Value::Int(i64::MAX), &r, &SystemClock).unwrap());
    }

    #[test]
    fn test_unsupported_kind_is_fault() {
        let p = params(&[("value", Value::Int(3))]);
        let err = run(&MinEvaluator, &Value::Bool(true), &p, &SystemClock).unwrap_err();
        assert!(err.is_fault());
    }

    #[test]
    fn test_check_parameters() {
        assert!(MinEvaluator.check_parameters(&Parameters::new()).is_err());
        assert!(RangeEvaluator.check_parameters(&Parameters::new()).is_ok());
    }
}
