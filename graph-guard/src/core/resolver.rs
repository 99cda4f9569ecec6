//! Turns requested groups into an ordered validation plan.
//!
//! A [`ValidationPlan`] is a list of [`PlanStep`]s. A plain [`PlanStep::Batch`]
//! is evaluated once. A [`PlanStep::Sequence`] holds ordered batches; the first
//! batch that yields a violation ends the sequence.
//!
//! Resolution rules:
//!
//! - no requested group means `Default`;
//! - `Default`, when the root type overrides its default sequence, becomes a
//!   sequence of single-group batches in the declared order;
//! - a named sequence from the catalog becomes a sequence step, with nested
//!   sequences inlined;
//! - every other group joins one plain batch, scheduled after the sequence
//!   steps, or before them when `ForceFirstInSequence` is requested.
//!
//! All cycle checks happen here, before anything is traversed.

use super::group::{GroupCatalog, GroupId, GroupSet};
use crate::error::{GuardError, Result};
use std::fmt;
use tracing::{debug, instrument};

/// One step of a [`ValidationPlan`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    /// Groups evaluated together in one pass
    Batch(GroupSet),
    /// Batches evaluated in order, stopping after the first one that fails
    Sequence {
        /// The group that was expanded into this sequence
        name: GroupId,
        /// The batches, in order
        batches: Vec<GroupSet>,
    },
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStep::Batch(groups) => write!(f, "{groups}"),
            PlanStep::Sequence { name, batches } => {
                let parts: Vec<String> = batches.iter().map(ToString::to_string).collect();
                write!(f, "{name}: {}", parts.join(" -> "))
            }
        }
    }
}

/// Ordered steps produced by [`GroupResolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationPlan {
    steps: Vec<PlanStep>,
}

impl ValidationPlan {
    /// The steps, in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Total number of batches across all steps.
    pub fn batch_count(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s {
                PlanStep::Batch(_) => 1,
                PlanStep::Sequence { batches, .. } => batches.len(),
            })
            .sum()
    }
}

impl fmt::Display for ValidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Resolves requested groups against a [`GroupCatalog`].
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{GroupCatalog, GroupId, GroupResolver, GroupSet, PlanStep};
///
/// let catalog = GroupCatalog::new();
/// let resolver = GroupResolver::new(&catalog);
/// let plan = resolver
///     .resolve(&GroupSet::new(), Some(&[GroupId::new("Cheap"), GroupId::new("Expensive")]))
///     .unwrap();
///
/// assert_eq!(plan.batch_count(), 2);
/// assert!(matches!(plan.steps()[0], PlanStep::Sequence { .. }));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GroupResolver<'a> {
    catalog: &'a GroupCatalog,
}

impl<'a> GroupResolver<'a> {
    /// Creates a resolver over `catalog`.
    pub fn new(catalog: &'a GroupCatalog) -> Self {
        Self { catalog }
    }

    /// Builds the plan for `requested` groups.
    ///
    /// `default_override` is the default sequence declared by the root type, if
    /// any.
    #[instrument(skip(self, requested, default_override), fields(requested = %requested))]
    pub fn resolve(
        &self,
        requested: &GroupSet,
        default_override: Option<&[GroupId]>,
    ) -> Result<ValidationPlan> {
        let force_first = requested.contains(&GroupId::FORCE_FIRST_IN_SEQUENCE);
        let force_last = requested.contains(&GroupId::FORCE_LAST_IN_SEQUENCE);
        if force_first && force_last {
            return Err(GuardError::Configuration(
                "ForceFirstInSequence and ForceLastInSequence cannot be requested together"
                    .to_string(),
            ));
        }

        let mut groups: GroupSet = requested.iter().filter(|g| !g.is_marker()).cloned().collect();
        if groups.is_empty() {
            groups = GroupSet::default_only();
        }

        let mut sequences = Vec::new();
        let mut plain = GroupSet::new();

        for group in &groups {
            if group.is_default() {
                if let Some(members) = default_override {
                    sequences.push(PlanStep::Sequence {
                        name: GroupId::DEFAULT,
                        batches: self.override_batches(members)?,
                    });
                    continue;
                }
            }

            match self.catalog.sequence_of(group) {
                Some(members) => {
                    let mut trail = vec![group.clone()];
                    let flat = self.catalog.flatten(members, &mut trail)?;
                    let mut batches = Vec::with_capacity(flat.len());
                    for member in flat {
                        match default_override {
                            Some(over) if member.is_default() => {
                                batches.extend(self.override_batches(over)?);
                            }
                            _ => batches.push(GroupSet::single(member)),
                        }
                    }
                    sequences.push(PlanStep::Sequence {
                        name: group.clone(),
                        batches,
                    });
                }
                None => {
                    plain.insert(group.clone());
                }
            }
        }

        let mut steps = sequences;
        if !plain.is_empty() {
            if force_first {
                steps.insert(0, PlanStep::Batch(plain));
            } else {
                steps.push(PlanStep::Batch(plain));
            }
        }

        let plan = ValidationPlan { steps };
        debug!(plan = %plan, batches = plan.batch_count(), "Resolved validation plan");
        Ok(plan)
    }

    /// Expands a default-sequence override into single-group batches.
    pub(crate) fn override_batches(&self, members: &[GroupId]) -> Result<Vec<GroupSet>> {
        let mut trail = vec![GroupId::DEFAULT];
        Ok(self
            .catalog
            .flatten(members, &mut trail)?
            .into_iter()
            .map(GroupSet::single)
            .collect())
    }
}
