//! Append-only violation accumulator for one validation call.

use super::constraint::ConstraintModel;
use super::group::GroupSet;
use super::interpolator::{Locale, MessageInterpolator};
use super::path::PropertyPath;
use super::value::{ObjectId, TypeName, Value};
use super::violation::{Violation, ViolationSet};
use crate::logging::{truncate_field, LogConfig};
use std::sync::Arc;
use tracing::debug;

/// A failure reported by the traversal engine, before interpolation.
pub(crate) struct Failure<'a> {
    pub constraint: &'a Arc<ConstraintModel>,
    pub invalid_value: &'a Value,
    pub path: &'a PropertyPath,
    pub leaf_bean: Option<ObjectId>,
    pub groups: &'a GroupSet,
}

/// Accumulates the violations of one call and tracks fail-fast halting.
///
/// Messages are interpolated only when a violation is accepted.
pub struct ViolationCollector<'a> {
    root_type: TypeName,
    root_value: Value,
    fail_fast: bool,
    halted: bool,
    violations: Vec<Violation>,
    interpolator: &'a dyn MessageInterpolator,
    locale: &'a Locale,
    log: &'a LogConfig,
}

impl<'a> ViolationCollector<'a> {
    pub(crate) fn new(
        root_type: TypeName,
        root_value: Value,
        fail_fast: bool,
        interpolator: &'a dyn MessageInterpolator,
        locale: &'a Locale,
        log: &'a LogConfig,
    ) -> Self {
        Self {
            root_type,
            root_value,
            fail_fast,
            halted: false,
            violations: Vec::new(),
            interpolator,
            locale,
            log,
        }
    }

    /// Records a failure. Returns false if the collector has already halted.
    pub(crate) fn add(&mut self, failure: Failure<'_>) -> bool {
        if self.halted {
            return false;
        }

        let template = failure.constraint.message_template();
        let message = self.interpolator.interpolate(
            template,
            failure.constraint,
            failure.invalid_value,
            self.locale,
        );

        if self.log.log_violations {
            debug!(
                constraint = failure.constraint.name(),
                path = %failure.path,
                invalid_value = %truncate_field(&failure.invalid_value.to_string(), self.log.max_field_length),
                violation.message = %message,
                "Collected violation"
            );
        }

        self.violations.push(Violation {
            constraint: Arc::clone(failure.constraint),
            root_type: self.root_type.clone(),
            root_value: self.root_value.clone(),
            leaf_bean: failure.leaf_bean,
            invalid_value: failure.invalid_value.clone(),
            property_path: failure.path.clone(),
            message_template: template.to_string(),
            message,
            groups: failure.groups.clone(),
        });

        if self.fail_fast {
            self.halted = true;
        }
        true
    }

    /// Returns true once fail-fast has been triggered.
    pub fn should_stop(&self) -> bool {
        self.halted
    }

    /// Number of violations collected so far.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Finishes the call.
    pub fn into_set(self) -> ViolationSet {
        ViolationSet::from_vec(self.violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::ParameterMessageInterpolator;
    use crate::core::GroupId;

    fn collector<'a>(
        fail_fast: bool,
        interpolator: &'a ParameterMessageInterpolator,
        locale: &'a Locale,
        log: &'a LogConfig,
    ) -> ViolationCollector<'a> {
        ViolationCollector::new(
            TypeName::from("Order"),
            Value::Null,
            fail_fast,
            interpolator,
            locale,
            log,
        )
    }

    #[test]
    fn test_fail_fast_halts_after_first() {
        let interpolator = ParameterMessageInterpolator::new();
        let locale = Locale::default();
        let log = LogConfig::default();
        let mut c = collector(true, &interpolator, &locale, &log);

        let model = Arc::new(ConstraintModel::leaf("NotNull").build().unwrap());
        let path = PropertyPath::root().property("id");
        let groups = GroupSet::single(GroupId::DEFAULT);
        let failure = || Failure {
            constraint: &model,
            invalid_value: &Value::Null,
            path: &path,
            leaf_bean: None,
            groups: &groups,
        };

        assert!(c.add(failure()));
        assert!(c.should_stop());
        assert!(!c.add(failure()));

        let set = c.into_set();
        assert_eq!(set.len(), 1);
        assert_eq!(set.messages(), vec!["must not be null"]);
        assert_eq!(set.as_slice()[0].to_string(), "Order.id: must not be null");
    }

    #[test]
    fn test_collect_all_keeps_duplicates() {
        let interpolator = ParameterMessageInterpolator::new();
        let locale = Locale::default();
        let log = LogConfig::default();
        let mut c = collector(false, &interpolator, &locale, &log);

        let model = Arc::new(ConstraintModel::leaf("NotNull").message("gone").build().unwrap());
        let path = PropertyPath::root();
        let groups = GroupSet::default_only();
        for _ in 0..2 {
            c.add(Failure {
                constraint: &model,
                invalid_value: &Value::Null,
                path: &path,
                leaf_bean: None,
                groups: &groups,
            });
        }
        assert!(!c.should_stop());
        let set = c.into_set();
        assert_eq!(set.len(), 2);
        assert!(set.as_slice()[0].same_as(&set.as_slice()[1]));
        assert_eq!(set.as_slice()[0].to_string(), "Order: gone");
    }
}
