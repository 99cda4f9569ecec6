//! Violations: the expected output of a validation call.

use super::constraint::ConstraintModel;
use super::group::GroupSet;
use super::path::PropertyPath;
use super::value::{ObjectId, TypeName, Value};
use std::fmt;
use std::sync::Arc;

/// One failure of one constraint at one path.
#[derive(Debug, Clone)]
pub struct Violation {
    pub(crate) constraint: Arc<ConstraintModel>,
    pub(crate) root_type: TypeName,
    pub(crate) root_value: Value,
    pub(crate) leaf_bean: Option<ObjectId>,
    pub(crate) invalid_value: Value,
    pub(crate) property_path: PropertyPath,
    pub(crate) message_template: String,
    pub(crate) message: String,
    pub(crate) groups: GroupSet,
}

impl Violation {
    /// The constraint that failed.
    pub fn constraint(&self) -> &Arc<ConstraintModel> {
        &self.constraint
    }

    /// Type the validation call was made against.
    pub fn root_type(&self) -> &TypeName {
        &self.root_type
    }

    /// The validated root value; `Null` for `validate_value`.
    pub fn root_value(&self) -> &Value {
        &self.root_value
    }

    /// The bean holding the failing property, if there is one.
    pub fn leaf_bean(&self) -> Option<ObjectId> {
        self.leaf_bean
    }

    /// The value that failed.
    pub fn invalid_value(&self) -> &Value {
        &self.invalid_value
    }

    /// Path from the root to the failing value.
    pub fn property_path(&self) -> &PropertyPath {
        &self.property_path
    }

    /// Message template before interpolation.
    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Interpolated message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Groups active when the constraint was evaluated.
    pub fn groups(&self) -> &GroupSet {
        &self.groups
    }

    /// Returns true if both violations come from the same constraint
    /// occurrence at the same path with the same invalid value.
    pub fn same_as(&self, other: &Violation) -> bool {
        Arc::ptr_eq(&self.constraint, &other.constraint)
            && self.property_path == other.property_path
            && self.invalid_value == other.invalid_value
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.property_path.is_empty() {
            write!(f, "{}: {}", self.root_type, self.message)
        } else {
            write!(
                f,
                "{}.{}: {}",
                self.root_type, self.property_path, self.message
            )
        }
    }
}

/// The violations of one validation call, in discovery order.
///
/// No deduplication is performed beyond what composition collapsing already
/// does.
#[derive(Debug, Clone, Default)]
pub struct ViolationSet {
    violations: Vec<Violation>,
}

impl ViolationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_vec(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if validation passed.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Iterates in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Returns the violations as a slice.
    pub fn as_slice(&self) -> &[Violation] {
        &self.violations
    }

    /// Interpolated messages, in discovery order.
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(Violation::message).collect()
    }

    /// Violations whose rendered path equals `path`.
    pub fn at_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations
            .iter()
            .filter(move |v| v.property_path.to_string() == path)
    }

    /// Returns true if a violation equal (by [`Violation::same_as`]) to `other`
    /// is present.
    pub fn contains(&self, other: &Violation) -> bool {
        self.violations.iter().any(|v| v.same_as(other))
    }
}

impl IntoIterator for ViolationSet {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ViolationSet {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}
