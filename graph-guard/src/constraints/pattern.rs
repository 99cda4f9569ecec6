//! `Pattern` evaluator with a per-instance regex cache.

use super::{unsupported, ConstraintEvaluator, EvaluationContext};
use crate::core::{Parameters, Value};
use crate::error::{GuardError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Text must match `regexp` in full.
#[derive(Debug, Default)]
pub struct PatternEvaluator {
    cache: RwLock<HashMap<String, Regex>>,
}

impl PatternEvaluator {
    /// Creates an evaluator with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn regexp(parameters: &Parameters) -> Result<&str> {
        parameters.get_str("regexp").ok_or_else(|| {
            GuardError::invalid_parameter("Pattern", "regexp", "a text value is required")
        })
    }

    fn compile(pattern: &str) -> Result<Regex> {
        Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            GuardError::invalid_parameter("Pattern", "regexp", format!("invalid regex: {e}"))
        })
    }

    fn is_match(&self, pattern: &str, text: &str) -> Result<bool> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| GuardError::Internal("pattern cache lock poisoned".to_string()))?;
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.is_match(text));
            }
        }

        let regex = Self::compile(pattern).map_err(|e| {
            GuardError::evaluator_fault_with_source("Pattern", "cannot compile regexp", Box::new(e))
        })?;
        let matched = regex.is_match(text);
        let mut cache = self
            .cache
            .write()
            .map_err(|_| GuardError::Internal("pattern cache lock poisoned".to_string()))?;
        debug!(pattern, cached = cache.len() + 1, "Compiled pattern");
        cache.insert(pattern.to_string(), regex);
        Ok(matched)
    }
}

impl ConstraintEvaluator for PatternEvaluator {
    fn evaluate(
        &self,
        value: &Value,
        parameters: &Parameters,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        match value {
            Value::Null => Ok(true),
            Value::Text(text) => self.is_match(Self::regexp(parameters)?, text),
            other => Err(unsupported("Pattern", other)),
        }
    }

    fn check_parameters(&self, parameters: &Parameters) -> Result<()> {
        Self::compile(Self::regexp(parameters)?).map(|_| ())
    }
}
