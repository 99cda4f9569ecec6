//! Constraint models: immutable descriptions of one constraint occurrence.

use super::group::{GroupId, GroupSet};
use super::value::Value;
use crate::constraints::EvaluatorId;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How the children of a composed constraint combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositionRule {
    /// Valid if every child is valid
    And,
    /// Valid if at least one child is valid
    Or,
    /// Valid if every child is invalid
    AllFalse,
}

impl fmt::Display for CompositionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionRule::And => f.write_str("AND"),
            CompositionRule::Or => f.write_str("OR"),
            CompositionRule::AllFalse => f.write_str("ALL_FALSE"),
        }
    }
}

/// The composition tree of a constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Composition {
    /// A single evaluator call
    Leaf(EvaluatorId),
    /// A boolean combination of child constraints
    Composite {
        /// Combination rule
        rule: CompositionRule,
        /// Inverts the combined result
        negate: bool,
        /// Children in declaration order
        children: Vec<Arc<ConstraintModel>>,
    },
}

/// Named constraint parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a parameter value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a parameter as an integer.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Returns a parameter as a float; integers are widened.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Returns a parameter as text.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Iterates over parameters sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One constraint occurrence.
///
/// Models are immutable once built and shared by reference between the
/// metadata index and every violation they produce.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{CompositionRule, ConstraintModel};
///
/// // null, or a non-blank string
/// let null_or_not_blank = ConstraintModel::composite("NullOrNotBlank", CompositionRule::Or)
///     .child(ConstraintModel::leaf("Null"))
///     .child(ConstraintModel::leaf("NotBlank"))
///     .report_as_single_violation()
///     .message("must be null or not blank")
///     .build()
///     .unwrap();
///
/// assert!(null_or_not_blank.is_composite());
/// assert_eq!(null_or_not_blank.children().len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintModel {
    name: String,
    composition: Composition,
    parameters: Parameters,
    groups: GroupSet,
    report_as_single_violation: bool,
    message_template: String,
}

impl ConstraintModel {
    /// Starts a leaf constraint backed by one evaluator.
    pub fn leaf(evaluator: impl Into<EvaluatorId>) -> ConstraintModelBuilder {
        let evaluator = evaluator.into();
        ConstraintModelBuilder::new(evaluator.as_str().to_string(), Shape::Leaf(evaluator))
    }

    /// Starts a composed constraint.
    pub fn composite(name: impl Into<String>, rule: CompositionRule) -> ConstraintModelBuilder {
        ConstraintModelBuilder::new(
            name.into(),
            Shape::Composite {
                rule,
                negate: false,
                children: Vec::new(),
            },
        )
    }

    /// Constraint name, used for message lookup and reporting.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Composition tree.
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Evaluator of a leaf constraint.
    pub fn evaluator(&self) -> Option<&EvaluatorId> {
        match &self.composition {
            Composition::Leaf(id) => Some(id),
            Composition::Composite { .. } => None,
        }
    }

    /// Children of a composed constraint; empty for leaves.
    pub fn children(&self) -> &[Arc<ConstraintModel>] {
        match &self.composition {
            Composition::Leaf(_) => &[],
            Composition::Composite { children, .. } => children,
        }
    }

    /// Returns true for composed constraints.
    pub fn is_composite(&self) -> bool {
        matches!(self.composition, Composition::Composite { .. })
    }

    /// Parameters passed to the evaluator and the interpolator.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Declared groups; never empty.
    pub fn groups(&self) -> &GroupSet {
        &self.groups
    }

    /// Whether a failing composition reports only this constraint.
    pub fn report_as_single_violation(&self) -> bool {
        self.report_as_single_violation
    }

    /// Message template handed to the interpolator.
    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Visits this model and every descendant, depth first.
    pub fn walk(&self, visit: &mut dyn FnMut(&ConstraintModel) -> Result<()>) -> Result<()> {
        visit(self)?;
        for child in self.children() {
            child.walk(visit)?;
        }
        Ok(())
    }
}

impl fmt::Display for ConstraintModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.composition {
            Composition::Leaf(_) => f.write_str(&self.name),
            Composition::Composite {
                rule,
                negate,
                children,
            } => {
                if *negate {
                    f.write_str("NOT ")?;
                }
                let names: Vec<&str> = children.iter().map(|c| c.name()).collect();
                write!(f, "{}({} {})", self.name, rule, names.join(", "))
            }
        }
    }
}

enum Shape {
    Leaf(EvaluatorId),
    Composite {
        rule: CompositionRule,
        negate: bool,
        children: Vec<ConstraintModelBuilder>,
    },
}

/// Builder for [`ConstraintModel`].
pub struct ConstraintModelBuilder {
    name: String,
    shape: Shape,
    parameters: Parameters,
    groups: GroupSet,
    report_as_single_violation: bool,
    message_template: Option<String>,
    misuse: Option<&'static str>,
}

impl ConstraintModelBuilder {
    fn new(name: String, shape: Shape) -> Self {
        Self {
            name,
            shape,
            parameters: Parameters::new(),
            groups: GroupSet::new(),
            report_as_single_violation: false,
            message_template: None,
            misuse: None,
        }
    }

    /// Overrides the constraint name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    /// Adds a group.
    pub fn group(mut self, group: impl Into<GroupId>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Adds several groups.
    pub fn groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupId>,
    {
        for group in groups {
            self.groups.insert(group.into());
        }
        self
    }

    /// Sets the message template.
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.message_template = Some(template.into());
        self
    }

    /// Reports a failing composition as this constraint alone.
    pub fn report_as_single_violation(mut self) -> Self {
        self.report_as_single_violation = true;
        self
    }

    /// Inverts the combined result of a composed constraint.
    pub fn negate(mut self) -> Self {
        if let Shape::Composite { negate, .. } = &mut self.shape {
            *negate = true;
        }
        self
    }

    /// Appends a child to a composed constraint.
    ///
    /// Calling this on a leaf is reported by [`build`](Self::build).
    pub fn child(mut self, child: ConstraintModelBuilder) -> Self {
        match &mut self.shape {
            Shape::Composite { children, .. } => children.push(child),
            Shape::Leaf(_) => self.misuse = Some("a leaf constraint cannot have children"),
        }
        self
    }

    /// Validates the composition and produces the model.
    ///
    /// Fails with [`GuardError::MalformedComposition`] when a composite has
    /// no children, when a child declares groups that differ from its parent's,
    /// or when a sequence marker is used as a group.
    pub fn build(self) -> Result<ConstraintModel> {
        self.build_inner(None)
    }

    fn build_inner(self, inherited: Option<&GroupSet>) -> Result<ConstraintModel> {
        if let Some(reason) = self.misuse {
            return Err(GuardError::malformed(&self.name, reason));
        }
        if let Some(marker) = self.groups.iter().find(|g| g.is_marker()) {
            return Err(GuardError::malformed(
                &self.name,
                format!("'{marker}' is a sequence marker, not a group"),
            ));
        }

        let groups = match inherited {
            Some(parent) if self.groups.is_empty() => parent.clone(),
            Some(parent) if &self.groups != parent => {
                return Err(GuardError::malformed(
                    &self.name,
                    format!("declares groups {} but its composition uses {parent}", self.groups),
                ));
            }
            _ if self.groups.is_empty() => GroupSet::default_only(),
            _ => self.groups,
        };

        let composition = match self.shape {
            Shape::Leaf(id) => Composition::Leaf(id),
            Shape::Composite {
                rule,
                negate,
                children,
            } => {
                if children.is_empty() {
                    return Err(GuardError::malformed(
                        &self.name,
                        "composition has no children",
                    ));
                }
                let children = children
                    .into_iter()
                    .map(|child| child.build_inner(Some(&groups)).map(Arc::new))
                    .collect::<Result<Vec<_>>>()?;
                Composition::Composite {
                    rule,
                    negate,
                    children,
                }
            }
        };

        let message_template = self
            .message_template
            .unwrap_or_else(|| format!("{{{}.message}}", self.name));

        Ok(ConstraintModel {
            name: self.name,
            composition,
            parameters: self.parameters,
            groups,
            report_as_single_violation: self.report_as_single_violation,
            message_template,
        })
    }
}
