//! Per-call traversal state.
//!
//! A [`ValidationContext`] is created when a validation call starts and dropped
//! when it returns. It is never shared between calls, so it needs no locking.

use super::collector::{Failure, ViolationCollector};
use super::path::PropertyPath;
use super::value::{ObjectGraph, ObjectId};
use super::violation::ViolationSet;
use crate::error::{GuardError, Result};
use std::collections::HashMap;

/// Mutable state of one validation call.
pub struct ValidationContext<'a> {
    graph: Option<&'a ObjectGraph>,
    pass: usize,
    visited: HashMap<(usize, ObjectId), Vec<PropertyPath>>,
    collector: ViolationCollector<'a>,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(graph: Option<&'a ObjectGraph>, collector: ViolationCollector<'a>) -> Self {
        Self {
            graph,
            pass: 0,
            visited: HashMap::new(),
            collector,
        }
    }

    /// The graph being validated; `None` for `validate_value`.
    pub fn graph(&self) -> Option<&'a ObjectGraph> {
        self.graph
    }

    pub(crate) fn require_graph(&self) -> Result<&'a ObjectGraph> {
        self.graph
            .ok_or_else(|| GuardError::Internal("no object graph in this call".to_string()))
    }

    /// Starts a new batch. Objects visited in earlier batches may be visited again.
    pub(crate) fn begin_pass(&mut self) {
        self.pass += 1;
    }

    /// Current batch number, starting at 1.
    pub fn pass(&self) -> usize {
        self.pass
    }

    /// Records that `object` is being entered at `path`.
    ///
    /// Returns false, and records nothing, if the object was already entered
    /// in this batch at `path` or at a prefix of it. This is what makes
    /// validation terminate on cyclic graphs.
    pub(crate) fn enter_cascade(&mut self, object: ObjectId, path: &PropertyPath) -> bool {
        let seen = self.visited.entry((self.pass, object)).or_default();
        if seen.iter().any(|p| p.is_prefix_of(path)) {
            return false;
        }
        seen.push(path.clone());
        true
    }

    pub(crate) fn report(&mut self, failure: Failure<'_>) -> bool {
        self.collector.add(failure)
    }

    /// Number of violations collected so far.
    pub fn violation_count(&self) -> usize {
        self.collector.len()
    }

    /// Returns true once fail-fast has halted the call.
    pub fn should_stop(&self) -> bool {
        self.collector.should_stop()
    }

    pub(crate) fn into_violations(self) -> ViolationSet {
        self.collector.into_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::{Locale, ParameterMessageInterpolator};
    use crate::core::value::{TypeName, Value};
    use crate::logging::LogConfig;

    #[test]
    fn test_cycle_guard_is_per_pass_and_prefix_based() {
        let interpolator = ParameterMessageInterpolator::new();
        let locale = Locale::default();
        let log = LogConfig::default();
        let mut graph = ObjectGraph::new();
        let id = graph.insert("Node", Vec::<(&str, Value)>::new());
        let sibling = graph.insert("Node", Vec::<(&str, Value)>::new());

        let collector = ViolationCollector::new(
            TypeName::from("Node"),
            Value::Object(id),
            false,
            &interpolator,
            &locale,
            &log,
        );
        let mut ctx = ValidationContext::new(Some(&graph), collector);
        ctx.begin_pass();

        let root = PropertyPath::root();
        let next = root.property("next");
        let left = root.property("left");
        let right = root.property("right");
        assert!(ctx.enter_cascade(id, &root));
        assert!(!ctx.enter_cascade(id, &next));
        assert!(ctx.enter_cascade(sibling, &left));
        assert!(ctx.enter_cascade(sibling, &right));
        assert!(!ctx.enter_cascade(sibling, &left.property("deeper")));

        ctx.begin_pass();
        assert_eq!(ctx.pass(), 2);
        assert!(ctx.enter_cascade(id, &next));
        assert!(ctx.into_violations().is_empty());
    }
}
