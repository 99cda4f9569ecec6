//! Numeric comparisons used by the `Min`, `Max` and `Range` evaluators.

use super::EvaluatorId;
use crate::core::{Parameters, Value};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A comparison of a number against fixed bounds.
///
/// Bounds given as integers compare integer values exactly; floating-point
/// bounds, or floating-point values, compare as `f64`.
///
/// # Examples
///
/// ```rust
/// use graph_guard::constraints::Assertion;
///
/// assert!(Assertion::GreaterThanOrEqual(18.0).evaluate(18.0));
/// assert!(!Assertion::LessThanOrEqual(10.0).evaluate(10.5));
/// assert!(Assertion::Between(1.0, 5.0).evaluate(3.0));
///
/// // 2^53 + 1 is not representable as f64
/// assert!(!Assertion::AtLeast(9_007_199_254_740_993).evaluate_integer(9_007_199_254_740_992));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assertion {
    /// Value must be greater than or equal to the bound
    GreaterThanOrEqual(f64),
    /// Value must be less than or equal to the bound
    LessThanOrEqual(f64),
    /// Value must be within the range (inclusive)
    Between(f64, f64),
    /// Value must be at least the integer bound
    AtLeast(i64),
    /// Value must be at most the integer bound
    AtMost(i64),
    /// Value must be within the integer bounds (inclusive); `None` is open
    IntegerBetween(Option<i64>, Option<i64>),
}

impl Assertion {
    /// Evaluates the assertion against a floating-point value.
    pub fn evaluate(&self, value: f64) -> bool {
        match self {
            Assertion::GreaterThanOrEqual(min) => value >= *min,
            Assertion::LessThanOrEqual(max) => value <= *max,
            Assertion::Between(min, max) => value >= *min && value <= *max,
            Assertion::AtLeast(min) => value >= *min as f64,
            Assertion::AtMost(max) => value <= *max as f64,
            Assertion::IntegerBetween(min, max) => {
                min.map_or(true, |m| value >= m as f64) && max.map_or(true, |m| value <= m as f64)
            }
        }
    }

    /// Evaluates the assertion against an integer value.
    ///
    /// Integer bounds are compared exactly.
    pub fn evaluate_integer(&self, value: i64) -> bool {
        match self {
            Assertion::AtLeast(min) => value >= *min,
            Assertion::AtMost(max) => value <= *max,
            Assertion::IntegerBetween(min, max) => {
                min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
            }
            float => float.evaluate(value as f64),
        }
    }

    /// Returns a human-readable description of the assertion.
    pub fn description(&self) -> String {
        match self {
            Assertion::GreaterThanOrEqual(v) => format!("greater than or equal to {v}"),
            Assertion::LessThanOrEqual(v) => format!("less than or equal to {v}"),
            Assertion::Between(min, max) => format!("between {min} and {max}"),
            Assertion::AtLeast(v) => format!("greater than or equal to {v}"),
            Assertion::AtMost(v) => format!("less than or equal to {v}"),
            Assertion::IntegerBetween(min, max) => match (min, max) {
                (Some(min), Some(max)) => format!("between {min} and {max}"),
                (Some(min), None) => format!("greater than or equal to {min}"),
                (None, Some(max)) => format!("less than or equal to {max}"),
                (None, None) => "any number".to_string(),
            },
        }
    }

    /// Builds the assertion of a `Min`, `Max` or `Range` constraint.
    pub(crate) fn from_parameters(evaluator: &EvaluatorId, parameters: &Parameters) -> Result<Self> {
        let bound = |name: &str| {
            parameters.get_f64(name).ok_or_else(|| {
                GuardError::invalid_parameter(evaluator.as_str(), name, "a numeric value is required")
            })
        };

        let integer = |name: &str| match parameters.get(name) {
            Some(Value::Int(i)) => Some(*i),
            _ => None,
        };
        let range_bounds: Vec<&Value> = ["min", "max"]
            .iter()
            .filter_map(|name| parameters.get(name))
            .collect();
        let integral_range = !range_bounds.is_empty()
            && range_bounds.iter().all(|v| matches!(v, Value::Int(_)));

        match evaluator.as_str() {
            "Min" => Ok(match integer("value") {
                Some(min) => Assertion::AtLeast(min),
                None => Assertion::GreaterThanOrEqual(bound("value")?),
            }),
            "Max" => Ok(match integer("value") {
                Some(max) => Assertion::AtMost(max),
                None => Assertion::LessThanOrEqual(bound("value")?),
            }),
            _ if integral_range => {
                let (min, max) = (integer("min"), integer("max"));
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(GuardError::invalid_parameter(
                            evaluator.as_str(),
                            "min",
                            format!("min ({lo}) must not exceed max ({hi})"),
                        ));
                    }
                }
                Ok(Assertion::IntegerBetween(min, max))
            }
            _ => {
                let min = parameters.get_f64("min").unwrap_or(f64::NEG_INFINITY);
                let max = parameters.get_f64("max").unwrap_or(f64::INFINITY);
                if min > max {
                    return Err(GuardError::invalid_parameter(
                        evaluator.as_str(),
                        "min",
                        format!("min ({min}) must not exceed max ({max})"),
                    ));
                }
                Ok(Assertion::Between(min, max))
            }
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
