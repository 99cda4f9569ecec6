//! `Past`, `PastOrPresent`, `Future` and `FutureOrPresent` evaluators.
//!
//! Timestamps are compared with the instant returned by the validator's
//! [`ClockProvider`](super::ClockProvider). Null is valid.

use super::{unsupported, ConstraintEvaluator, EvaluationContext};
use crate::core::{Parameters, Value};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which side of "now" a timestamp must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalDirection {
    /// Strictly before now
    Past,
    /// Before or equal to now
    PastOrPresent,
    /// Strictly after now
    Future,
    /// After or equal to now
    FutureOrPresent,
}

impl TemporalDirection {
    fn id(&self) -> &'static str {
        match self {
            TemporalDirection::Past => "Past",
            TemporalDirection::PastOrPresent => "PastOrPresent",
            TemporalDirection::Future => "Future",
            TemporalDirection::FutureOrPresent => "FutureOrPresent",
        }
    }
}

/// Compares a timestamp with the clock.
#[derive(Debug, Clone, Copy)]
pub struct TemporalEvaluator {
    direction: TemporalDirection,
}

impl TemporalEvaluator {
    /// Creates an evaluator for `direction`.
    pub fn new(direction: TemporalDirection) -> Self {
        Self { direction }
    }
}

impl ConstraintEvaluator for TemporalEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        _parameters: &Parameters,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        let ts = match value {
            Value::Null => return Ok(true),
            Value::Timestamp(ts) => *ts,
            other => return Err(unsupported(self.direction.id(), other)),
        };
        let now = ctx.clock.now();
        Ok(match self.direction {
            TemporalDirection::Past => ts < now,
            TemporalDirection::PastOrPresent => ts <= now,
            TemporalDirection::Future => ts > now,
            TemporalDirection::FutureOrPresent => ts >= now,
        })
    }
}
