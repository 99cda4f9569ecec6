//! Validation groups, group sets and the group catalog.
//!
//! A [`GroupId`] names a validation context. Constraints declare the groups they
//! belong to; a validation call activates a set of groups and only constraints
//! in one of those groups (or in a group an active group extends) are evaluated.
//!
//! The [`GroupCatalog`] records two relations between groups:
//!
//! - **inheritance**: requesting `Strict` also activates every group `Strict`
//!   extends;
//! - **named sequences**: requesting a sequence group expands it into ordered
//!   batches with short-circuit on the first batch that yields violations.

use super::value::TypeName;
use crate::error::{GuardError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a validation group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupId {
    /// The implicit group of every constraint that declares no group
    Default,
    /// Marker: schedule plain groups before sequence batches
    ForceFirstInSequence,
    /// Marker: schedule plain groups after sequence batches
    ForceLastInSequence,
    /// A user-defined group
    Named(Arc<str>),
    /// The implicit group holding the `Default` constraints declared on a type
    Type(TypeName),
}

impl GroupId {
    /// The reserved `Default` group.
    pub const DEFAULT: GroupId = GroupId::Default;
    /// The reserved force-first marker.
    pub const FORCE_FIRST_IN_SEQUENCE: GroupId = GroupId::ForceFirstInSequence;
    /// The reserved force-last marker.
    pub const FORCE_LAST_IN_SEQUENCE: GroupId = GroupId::ForceLastInSequence;

    /// Creates a group from its name.
    ///
    /// The reserved names `Default`, `ForceFirstInSequence` and
    /// `ForceLastInSequence` map to the reserved ids.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use graph_guard::core::GroupId;
    ///
    /// assert_eq!(GroupId::new("Default"), GroupId::DEFAULT);
    /// assert_eq!(GroupId::new("Billing").as_str(), "Billing");
    /// ```
    pub fn new(name: impl AsRef<str>) -> Self {
        match name.as_ref() {
            "Default" => GroupId::Default,
            "ForceFirstInSequence" => GroupId::ForceFirstInSequence,
            "ForceLastInSequence" => GroupId::ForceLastInSequence,
            other => GroupId::Named(Arc::from(other)),
        }
    }

    /// Returns the type group of `type_name`.
    pub fn for_type(type_name: impl Into<TypeName>) -> Self {
        GroupId::Type(type_name.into())
    }

    /// Returns the display name of the group.
    pub fn as_str(&self) -> &str {
        match self {
            GroupId::Default => "Default",
            GroupId::ForceFirstInSequence => "ForceFirstInSequence",
            GroupId::ForceLastInSequence => "ForceLastInSequence",
            GroupId::Named(name) => name,
            GroupId::Type(type_name) => type_name.as_str(),
        }
    }

    /// Returns true for the sequence ordering markers.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            GroupId::ForceFirstInSequence | GroupId::ForceLastInSequence
        )
    }

    /// Returns true for `Default`.
    pub fn is_default(&self) -> bool {
        matches!(self, GroupId::Default)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for GroupId {
    fn from(name: &str) -> Self {
        GroupId::new(name)
    }
}

/// Insertion-ordered set of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSet(IndexSet<GroupId>);

impl GroupSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding only `Default`.
    pub fn default_only() -> Self {
        Self::single(GroupId::Default)
    }

    /// Creates a set holding one group.
    pub fn single(group: GroupId) -> Self {
        let mut set = IndexSet::new();
        set.insert(group);
        Self(set)
    }

    /// Adds a group; returns false if it was already present.
    pub fn insert(&mut self, group: GroupId) -> bool {
        self.0.insert(group)
    }

    /// Returns true if the group is in the set.
    pub fn contains(&self, group: &GroupId) -> bool {
        self.0.contains(group)
    }

    /// Returns true if any group of `other` is in this set.
    pub fn intersects(&self, other: &GroupSet) -> bool {
        other.iter().any(|g| self.contains(g))
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupId> {
        self.0.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy with every type group replaced by `Default`.
    pub fn with_type_groups_as_default(&self) -> GroupSet {
        self.iter()
            .map(|g| match g {
                GroupId::Type(_) => GroupId::Default,
                other => other.clone(),
            })
            .collect()
    }
}

impl FromIterator<GroupId> for GroupSet {
    fn from_iter<I: IntoIterator<Item = GroupId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a GroupSet {
    type Item = &'a GroupId;
    type IntoIter = indexmap::set::Iter<'a, GroupId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for GroupSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(GroupId::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Group inheritance and named group sequences.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{GroupCatalog, GroupId};
///
/// let catalog = GroupCatalog::new()
///     .extends("Strict", ["Basic"])
///     .sequence("Ordered", ["Basic", "Strict"]);
///
/// assert!(catalog.is_sequence(&GroupId::new("Ordered")));
/// assert!(catalog.ancestors_of(&GroupId::new("Strict")).contains(&GroupId::new("Basic")));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupCatalog {
    parents: IndexMap<GroupId, Vec<GroupId>>,
    sequences: IndexMap<GroupId, Vec<GroupId>>,
}

impl GroupCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `group` extends each of `parents`.
    pub fn extends<G, I, P>(mut self, group: G, parents: I) -> Self
    where
        G: Into<GroupId>,
        I: IntoIterator<Item = P>,
        P: Into<GroupId>,
    {
        self.parents
            .entry(group.into())
            .or_default()
            .extend(parents.into_iter().map(Into::into));
        self
    }

    /// Declares a named group sequence.
    pub fn sequence<G, I, P>(mut self, name: G, groups: I) -> Self
    where
        G: Into<GroupId>,
        I: IntoIterator<Item = P>,
        P: Into<GroupId>,
    {
        self.sequences
            .insert(name.into(), groups.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if `group` names a sequence.
    pub fn is_sequence(&self, group: &GroupId) -> bool {
        self.sequences.contains_key(group)
    }

    /// Returns the declared members of a sequence.
    pub fn sequence_of(&self, group: &GroupId) -> Option<&[GroupId]> {
        self.sequences.get(group).map(Vec::as_slice)
    }

    /// Returns `group` plus every group it transitively extends.
    pub fn ancestors_of(&self, group: &GroupId) -> GroupSet {
        let mut out = GroupSet::new();
        let mut stack = vec![group.clone()];
        while let Some(next) = stack.pop() {
            if !out.insert(next.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&next) {
                stack.extend(parents.iter().cloned());
            }
        }
        out
    }

    /// Expands every group of `active` with its ancestors.
    pub fn expand(&self, active: &GroupSet) -> GroupSet {
        let mut out = GroupSet::new();
        for group in active {
            for g in &self.ancestors_of(group) {
                out.insert(g.clone());
            }
        }
        out
    }

    /// Flattens a sequence of groups, inlining nested sequences.
    ///
    /// `trail` holds the sequence names currently being expanded; meeting one
    /// of them again is a [`GuardError::GroupCycle`].
    pub fn flatten(&self, groups: &[GroupId], trail: &mut Vec<GroupId>) -> Result<Vec<GroupId>> {
        let mut out = Vec::new();
        for group in groups {
            if trail.contains(group) {
                let mut cycle = trail.clone();
                cycle.push(group.clone());
                return Err(GuardError::GroupCycle { cycle });
            }
            match self.sequences.get(group) {
                Some(members) => {
                    trail.push(group.clone());
                    out.extend(self.flatten(members, trail)?);
                    trail.pop();
                }
                None => out.push(group.clone()),
            }
        }
        Ok(out)
    }

    /// Checks every declared sequence for cycles.
    pub fn check(&self) -> Result<()> {
        for (name, members) in &self.sequences {
            if name.is_default() || name.is_marker() {
                return Err(GuardError::Configuration(format!(
                    "reserved group '{name}' cannot be declared as a sequence"
                )));
            }
            let mut trail = vec![name.clone()];
            self.flatten(members, &mut trail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert_eq!(GroupId::new("Default"), GroupId::DEFAULT);
        assert!(GroupId::new("ForceLastInSequence").is_marker());
        assert!(!GroupId::new("Billing").is_marker());
        assert_eq!(GroupId::for_type("Order").as_str(), "Order");
        assert_ne!(GroupId::for_type("Order"), GroupId::new("Order"));
    }

    #[test]
    fn test_ancestors_follow_inheritance_transitively() {
        let catalog = GroupCatalog::new()
            .extends("C", ["B"])
            .extends("B", ["A"])
            .extends("A", ["C"]);

        let ancestors = catalog.ancestors_of(&GroupId::new("C"));
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors.contains(&GroupId::new("A")));
    }

    #[test]
    fn test_flatten_inlines_nested_sequences() {
        let catalog = GroupCatalog::new()
            .sequence("Inner", ["B", "C"])
            .sequence("Outer", ["A", "Inner", "D"]);

        let flat = catalog
            .flatten(&[GroupId::new("Outer")], &mut Vec::new())
            .unwrap();
        let names: Vec<&str> = flat.iter().map(GroupId::as_str).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_sequence_cycle_detected() {
        let catalog = GroupCatalog::new()
            .sequence("S1", ["A", "S2"])
            .sequence("S2", ["S1"]);

        let err = catalog.check().unwrap_err();
        assert!(matches!(err, GuardError::GroupCycle { .. }));
        assert!(err.to_string().contains("S1 -> S2 -> S1"));
    }

    #[test]
    fn test_type_groups_replaced_by_default() {
        let set: GroupSet = [GroupId::for_type("Order"), GroupId::new("Extra")]
            .into_iter()
            .collect();
        let converted = set.with_type_groups_as_default();
        assert!(converted.contains(&GroupId::DEFAULT));
        assert!(converted.contains(&GroupId::new("Extra")));
        assert_eq!(converted.to_string(), "[Default, Extra]");
    }
}
