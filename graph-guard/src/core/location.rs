//! Where constraints attach: type-level positions, bean properties and
//! container elements.
//!
//! Metadata for one type is described by a [`TypeMetadata`], assembled with
//! [`TypeMetadata::builder`]. Properties carry their own constraints, an
//! optional cascade flag with group conversions, and a tree of
//! [`ContainerElementMetadata`] for constraints declared on the elements of a
//! container-valued property.
//!
//! ```rust
//! use graph_guard::core::{
//!     ConstraintModel, ContainerElementKind, ContainerElementMetadata, PropertyMetadata,
//!     TypeMetadata,
//! };
//!
//! # fn main() -> graph_guard::error::Result<()> {
//! let order = TypeMetadata::builder("Order")
//!     .property(
//!         PropertyMetadata::new("lines")
//!             .constraint(ConstraintModel::leaf("NotEmpty").build()?)
//!             .element(ContainerElementMetadata::new(ContainerElementKind::Element).cascade()),
//!     )
//!     .build()?;
//!
//! assert_eq!(order.properties().count(), 1);
//! # Ok(())
//! # }
//! ```

use super::constraint::ConstraintModel;
use super::group::{GroupId, GroupSet};
use super::value::TypeName;
use crate::error::{GuardError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which part of a container a [`ContainerElementMetadata`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerElementKind {
    /// Elements of a list (indexed) or a set (unindexed)
    Element,
    /// Values of a map, addressed by key
    MapValue,
    /// Keys of a map
    MapKey,
    /// Content of an optional-like wrapper
    Unwrapped,
}

impl ContainerElementKind {
    /// Type argument position of the element in its container.
    pub fn type_argument(&self) -> usize {
        match self {
            ContainerElementKind::MapValue => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for ContainerElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerElementKind::Element => f.write_str("element"),
            ContainerElementKind::MapValue => f.write_str("map value"),
            ContainerElementKind::MapKey => f.write_str("map key"),
            ContainerElementKind::Unwrapped => f.write_str("unwrapped value"),
        }
    }
}

/// Kind of a location inside a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    /// The validated value itself (type-level constraints)
    Root,
    /// A bean property
    Property(String),
    /// An element of a container-valued property
    ContainerElement {
        /// Owning property
        property: String,
        /// Container kinds from the property down to this element
        chain: Vec<ContainerElementKind>,
    },
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::Root => f.write_str("<root>"),
            LocationKind::Property(name) => f.write_str(name),
            LocationKind::ContainerElement { property, chain } => {
                f.write_str(property)?;
                for kind in chain {
                    write!(f, "<{kind}>")?;
                }
                Ok(())
            }
        }
    }
}

impl LocationKind {
    /// The property this location belongs to; `None` for the root.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            LocationKind::Root => None,
            LocationKind::Property(name) => Some(name),
            LocationKind::ContainerElement { property, .. } => Some(property),
        }
    }
}

/// Hash key of a location: declaring type plus location kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    /// Declaring type
    pub type_name: TypeName,
    /// Location within the type
    pub kind: LocationKind,
}

impl LocationKey {
    /// Key of the type-level location.
    pub fn root(type_name: TypeName) -> Self {
        Self {
            type_name,
            kind: LocationKind::Root,
        }
    }

    /// Key of a property location.
    pub fn property(type_name: TypeName, property: impl Into<String>) -> Self {
        Self {
            type_name,
            kind: LocationKind::Property(property.into()),
        }
    }

    /// Key of a container element location.
    pub fn element(
        type_name: TypeName,
        property: impl Into<String>,
        chain: Vec<ContainerElementKind>,
    ) -> Self {
        Self {
            type_name,
            kind: LocationKind::ContainerElement {
                property: property.into(),
                chain,
            },
        }
    }
}

impl LocationKey {
    /// Key of the container element of `kind` directly below this location.
    ///
    /// The root location holds no container elements.
    pub fn nested(&self, kind: ContainerElementKind) -> Option<Self> {
        let (property, mut chain) = match &self.kind {
            LocationKind::Root => return None,
            LocationKind::Property(property) => (property.clone(), Vec::new()),
            LocationKind::ContainerElement { property, chain } => (property.clone(), chain.clone()),
        };
        chain.push(kind);
        Some(Self::element(self.type_name.clone(), property, chain))
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_name, self.kind)
    }
}

/// A location that is descended into during traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    /// Where the location is
    pub key: LocationKey,
    /// Whether the value at this location is cascaded into
    pub cascades: bool,
    /// Group conversions applied when cascading
    pub group_conversions: IndexMap<GroupId, GroupId>,
}

/// Constraints and cascade settings for one container element position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerElementMetadata {
    kind: ContainerElementKind,
    constraints: Vec<Arc<ConstraintModel>>,
    cascades: bool,
    group_conversions: IndexMap<GroupId, GroupId>,
    bean_type: Option<TypeName>,
    elements: Vec<ContainerElementMetadata>,
}

impl ContainerElementMetadata {
    /// Creates element metadata for the given container position.
    pub fn new(kind: ContainerElementKind) -> Self {
        Self {
            kind,
            constraints: Vec::new(),
            cascades: false,
            group_conversions: IndexMap::new(),
            bean_type: None,
            elements: Vec::new(),
        }
    }

    /// Adds an element-level constraint.
    pub fn constraint(mut self, model: ConstraintModel) -> Self {
        self.constraints.push(Arc::new(model));
        self
    }

    /// Cascades into each element.
    pub fn cascade(mut self) -> Self {
        self.cascades = true;
        self
    }

    /// Converts `from` into `to` when cascading into an element.
    pub fn convert_group(mut self, from: impl Into<GroupId>, to: impl Into<GroupId>) -> Self {
        self.group_conversions.insert(from.into(), to.into());
        self
    }

    /// Declares the static type of the elements, used to navigate paths
    /// without an instance.
    pub fn bean_type(mut self, type_name: impl Into<TypeName>) -> Self {
        self.bean_type = Some(type_name.into());
        self
    }

    /// Adds metadata for a nested container inside each element.
    pub fn element(mut self, nested: ContainerElementMetadata) -> Self {
        self.elements.push(nested);
        self
    }

    /// Container position.
    pub fn kind(&self) -> ContainerElementKind {
        self.kind
    }

    /// Element-level constraints.
    pub fn constraints(&self) -> &[Arc<ConstraintModel>] {
        &self.constraints
    }

    /// Whether elements are cascaded into.
    pub fn cascades(&self) -> bool {
        self.cascades
    }

    /// Group conversions applied when cascading.
    pub fn group_conversions(&self) -> &IndexMap<GroupId, GroupId> {
        &self.group_conversions
    }

    /// Declared element type, if any.
    pub fn declared_bean_type(&self) -> Option<&TypeName> {
        self.bean_type.as_ref()
    }

    /// Nested container element metadata.
    pub fn elements(&self) -> &[ContainerElementMetadata] {
        &self.elements
    }
}

/// Constraints, cascade settings and container elements of one property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyMetadata {
    name: String,
    constraints: Vec<Arc<ConstraintModel>>,
    cascades: bool,
    group_conversions: IndexMap<GroupId, GroupId>,
    bean_type: Option<TypeName>,
    elements: Vec<ContainerElementMetadata>,
}

impl PropertyMetadata {
    /// Creates metadata for the named property.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
            cascades: false,
            group_conversions: IndexMap::new(),
            bean_type: None,
            elements: Vec::new(),
        }
    }

    /// Adds a property-level constraint.
    pub fn constraint(mut self, model: ConstraintModel) -> Self {
        self.constraints.push(Arc::new(model));
        self
    }

    /// Cascades into the property value (or into its elements when the value
    /// is a container).
    pub fn cascade(mut self) -> Self {
        self.cascades = true;
        self
    }

    /// Converts `from` into `to` when cascading.
    pub fn convert_group(mut self, from: impl Into<GroupId>, to: impl Into<GroupId>) -> Self {
        self.group_conversions.insert(from.into(), to.into());
        self
    }

    /// Declares the static type of the property value.
    pub fn bean_type(mut self, type_name: impl Into<TypeName>) -> Self {
        self.bean_type = Some(type_name.into());
        self
    }

    /// Adds container element metadata.
    pub fn element(mut self, element: ContainerElementMetadata) -> Self {
        self.elements.push(element);
        self
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property-level constraints.
    pub fn constraints(&self) -> &[Arc<ConstraintModel>] {
        &self.constraints
    }

    /// Whether the value is cascaded into.
    pub fn cascades(&self) -> bool {
        self.cascades
    }

    /// Group conversions applied when cascading.
    pub fn group_conversions(&self) -> &IndexMap<GroupId, GroupId> {
        &self.group_conversions
    }

    /// Declared value type, if any.
    pub fn declared_bean_type(&self) -> Option<&TypeName> {
        self.bean_type.as_ref()
    }

    /// Container element metadata.
    pub fn elements(&self) -> &[ContainerElementMetadata] {
        &self.elements
    }
}

/// All metadata of one type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeMetadata {
    type_name: TypeName,
    constraints: Vec<Arc<ConstraintModel>>,
    properties: IndexMap<String, PropertyMetadata>,
    default_sequence: Option<Vec<GroupId>>,
}

impl TypeMetadata {
    /// Starts building metadata for `type_name`.
    pub fn builder(type_name: impl Into<TypeName>) -> TypeMetadataBuilder {
        TypeMetadataBuilder {
            type_name: type_name.into(),
            constraints: Vec::new(),
            properties: IndexMap::new(),
            default_sequence: None,
            duplicate: None,
        }
    }

    /// The described type.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Type-level constraints.
    pub fn constraints(&self) -> &[Arc<ConstraintModel>] {
        &self.constraints
    }

    /// Property metadata in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.values()
    }

    /// Metadata of one property.
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.get(name)
    }

    /// The redefined default group sequence, if the type declares one.
    pub fn default_sequence(&self) -> Option<&[GroupId]> {
        self.default_sequence.as_deref()
    }

    /// Returns true if `model` is active for this type under `active` groups.
    ///
    /// `active` must already include inherited groups. A constraint declared in
    /// `Default` also belongs to this type's type group.
    pub fn is_active(&self, model: &ConstraintModel, active: &GroupSet) -> bool {
        model.groups().iter().any(|g| {
            active.contains(g)
                || (g.is_default() && active.contains(&GroupId::Type(self.type_name.clone())))
        })
    }

    /// Visits every constraint declared anywhere on this type.
    pub fn for_each_constraint(
        &self,
        visit: &mut dyn FnMut(&LocationKey, &Arc<ConstraintModel>) -> Result<()>,
    ) -> Result<()> {
        let root = LocationKey::root(self.type_name.clone());
        for model in &self.constraints {
            visit(&root, model)?;
        }
        for property in self.properties.values() {
            let key = LocationKey::property(self.type_name.clone(), property.name());
            for model in property.constraints() {
                visit(&key, model)?;
            }
            for element in property.elements() {
                visit_elements(&self.type_name, property.name(), element, &mut Vec::new(), visit)?;
            }
        }
        Ok(())
    }
}

fn visit_elements(
    type_name: &TypeName,
    property: &str,
    element: &ContainerElementMetadata,
    chain: &mut Vec<ContainerElementKind>,
    visit: &mut dyn FnMut(&LocationKey, &Arc<ConstraintModel>) -> Result<()>,
) -> Result<()> {
    chain.push(element.kind());
    let key = LocationKey::element(type_name.clone(), property, chain.clone());
    for model in element.constraints() {
        visit(&key, model)?;
    }
    for nested in element.elements() {
        visit_elements(type_name, property, nested, chain, visit)?;
    }
    chain.pop();
    Ok(())
}

/// Builder for [`TypeMetadata`].
pub struct TypeMetadataBuilder {
    type_name: TypeName,
    constraints: Vec<Arc<ConstraintModel>>,
    properties: IndexMap<String, PropertyMetadata>,
    default_sequence: Option<Vec<GroupId>>,
    duplicate: Option<String>,
}

impl TypeMetadataBuilder {
    /// Adds a type-level constraint.
    pub fn constraint(mut self, model: ConstraintModel) -> Self {
        self.constraints.push(Arc::new(model));
        self
    }

    /// Adds a property.
    pub fn property(mut self, property: PropertyMetadata) -> Self {
        let name = property.name().to_string();
        if self.properties.insert(name.clone(), property).is_some() {
            self.duplicate.get_or_insert(name);
        }
        self
    }

    /// Redefines the `Default` group of this type as a sequence.
    ///
    /// The sequence must contain this type's own group
    /// ([`GroupId::for_type`]) and must not contain `Default`.
    pub fn default_sequence<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupId>,
    {
        self.default_sequence = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Checks the declarations and produces the metadata.
    pub fn build(self) -> Result<TypeMetadata> {
        if let Some(name) = self.duplicate {
            return Err(GuardError::Configuration(format!(
                "property '{name}' is declared twice on type '{}'",
                self.type_name
            )));
        }

        if let Some(sequence) = &self.default_sequence {
            if sequence.iter().any(GroupId::is_default) {
                return Err(GuardError::GroupCycle {
                    cycle: vec![GroupId::Default, GroupId::Default],
                });
            }
            if let Some(marker) = sequence.iter().find(|g| g.is_marker()) {
                return Err(GuardError::Configuration(format!(
                    "default group sequence of '{}' cannot contain '{marker}'",
                    self.type_name
                )));
            }
            let own = GroupId::for_type(self.type_name.clone());
            if !sequence.contains(&own) {
                return Err(GuardError::Configuration(format!(
                    "default group sequence of '{}' must contain the type group '{own}'",
                    self.type_name
                )));
            }
        }

        for property in self.properties.values() {
            check_conversions(
                &self.type_name,
                property.name(),
                property.cascades(),
                property.group_conversions(),
            )?;
            check_element_kinds(&self.type_name, property.name(), property.elements())?;
            for element in property.elements() {
                check_element_conversions(&self.type_name, property.name(), element)?;
            }
        }

        Ok(TypeMetadata {
            type_name: self.type_name,
            constraints: self.constraints,
            properties: self.properties,
            default_sequence: self.default_sequence,
        })
    }
}

/// Sibling container elements must have distinct kinds, so every element
/// location has exactly one declaration.
fn check_element_kinds(
    type_name: &TypeName,
    property: &str,
    elements: &[ContainerElementMetadata],
) -> Result<()> {
    for (i, element) in elements.iter().enumerate() {
        if elements[..i].iter().any(|e| e.kind() == element.kind()) {
            return Err(GuardError::Configuration(format!(
                "container element '{}' is declared twice on '{type_name}.{property}'",
                element.kind()
            )));
        }
        check_element_kinds(type_name, property, element.elements())?;
    }
    Ok(())
}

fn check_element_conversions(
    type_name: &TypeName,
    property: &str,
    element: &ContainerElementMetadata,
) -> Result<()> {
    check_conversions(
        type_name,
        property,
        element.cascades(),
        element.group_conversions(),
    )?;
    for nested in element.elements() {
        check_element_conversions(type_name, property, nested)?;
    }
    Ok(())
}

fn check_conversions(
    type_name: &TypeName,
    property: &str,
    cascades: bool,
    conversions: &IndexMap<GroupId, GroupId>,
) -> Result<()> {
    if conversions.is_empty() {
        return Ok(());
    }
    if !cascades {
        return Err(GuardError::Configuration(format!(
            "'{type_name}.{property}' declares group conversions but does not cascade"
        )));
    }
    if let Some((from, to)) = conversions
        .iter()
        .find(|(from, to)| from.is_marker() || to.is_marker())
    {
        return Err(GuardError::Configuration(format!(
            "'{type_name}.{property}' converts '{from}' to '{to}'; sequence markers cannot be converted"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_null() -> ConstraintModel {
        ConstraintModel::leaf("NotNull").build().unwrap()
    }

    #[test]
    fn test_for_each_constraint_visits_all_locations() {
        let metadata = TypeMetadata::builder("Order")
            .constraint(not_null())
            .property(
                PropertyMetadata::new("tags")
                    .constraint(not_null())
                    .element(
                        ContainerElementMetadata::new(ContainerElementKind::MapValue)
                            .constraint(not_null())
                            .element(
                                ContainerElementMetadata::new(ContainerElementKind::Element)
                                    .constraint(not_null()),
                            ),
                    ),
            )
            .build()
            .unwrap();

        let mut keys = Vec::new();
        metadata
            .for_each_constraint(&mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(
            keys,
            vec![
                "Order::<root>",
                "Order::tags",
                "Order::tags<map value>",
                "Order::tags<map value><element>",
            ]
        );
    }

    #[test]
    fn test_default_sequence_must_contain_type_group() {
        let err = TypeMetadata::builder("Order")
            .default_sequence(["Basic"])
            .build()
            .unwrap_err();
        assert!(matches!(err, GuardError::Configuration(_)));

        let ok = TypeMetadata::builder("Order")
            .default_sequence([GroupId::new("Basic"), GroupId::for_type("Order")])
            .build()
            .unwrap();
        assert_eq!(ok.default_sequence().map(<[GroupId]>::len), Some(2));
    }

    #[test]
    fn test_default_sequence_containing_default_is_a_cycle() {
        let err = TypeMetadata::builder("Order")
            .default_sequence([GroupId::DEFAULT, GroupId::for_type("Order")])
            .build()
            .unwrap_err();
        assert!(matches!(err, GuardError::GroupCycle { .. }));
    }

    #[test]
    fn test_conversion_without_cascade_rejected() {
        let err = TypeMetadata::builder("Order")
            .property(PropertyMetadata::new("customer").convert_group("Default", "Basic"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("does not cascade"));
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let err = TypeMetadata::builder("Order")
            .property(PropertyMetadata::new("id"))
            .property(PropertyMetadata::new("id"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_duplicate_container_element_rejected() {
        let err = TypeMetadata::builder("Order")
            .property(
                PropertyMetadata::new("lines")
                    .element(ContainerElementMetadata::new(ContainerElementKind::Element))
                    .element(
                        ContainerElementMetadata::new(ContainerElementKind::Element)
                            .constraint(not_null()),
                    ),
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("container element 'element' is declared twice"));
    }

    #[test]
    fn test_nested_location_keys() {
        let property = LocationKey::property(TypeName::from("Order"), "tags");
        let value = property.nested(ContainerElementKind::MapValue).unwrap();
        let element = value.nested(ContainerElementKind::Element).unwrap();

        assert_eq!(value.to_string(), "Order::tags<map value>");
        assert_eq!(element.to_string(), "Order::tags<map value><element>");
        assert_eq!(element.kind.property_name(), Some("tags"));
        assert!(LocationKey::root(TypeName::from("Order"))
            .nested(ContainerElementKind::Element)
            .is_none());
    }

    #[test]
    fn test_default_constraints_belong_to_type_group() {
        let metadata = TypeMetadata::builder("Order").build().unwrap();
        let model = not_null();
        let type_group = GroupSet::single(GroupId::for_type("Order"));
        let other_type_group = GroupSet::single(GroupId::for_type("Line"));

        assert!(metadata.is_active(&model, &GroupSet::default_only()));
        assert!(metadata.is_active(&model, &type_group));
        assert!(!metadata.is_active(&model, &other_type_group));
    }
}
