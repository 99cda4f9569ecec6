//! The metadata index: constraint models and locations of every known type.
//!
//! The index is built once, checked eagerly, and then shared read-only behind
//! an `Arc` by every validator and every validation call.

use super::constraint::ConstraintModel;
use super::group::{GroupCatalog, GroupId};
use super::location::{
    ContainerElementKind, ContainerElementMetadata, LocationDescriptor, LocationKey, TypeMetadata,
};
use super::value::TypeName;
use crate::error::{GuardError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Source of type metadata consumed by the traversal engine.
pub trait MetadataProvider: Send + Sync {
    /// Metadata of `type_name`, if the type is known.
    fn type_metadata(&self, type_name: &TypeName) -> Option<&TypeMetadata>;

    /// Group inheritance and named sequences.
    fn catalog(&self) -> &GroupCatalog;

    /// Constraints attached at one location, in declaration order.
    fn constraints_at(&self, key: &LocationKey) -> &[Arc<ConstraintModel>];

    /// Locations of `type_name` whose values are cascaded into.
    fn cascading_locations_of(&self, type_name: &TypeName) -> Vec<LocationDescriptor>;
}

/// Immutable, hash-indexed metadata for a set of types.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{
///     ConstraintModel, LocationKey, MetadataIndex, MetadataProvider, PropertyMetadata,
///     TypeMetadata, TypeName,
/// };
///
/// # fn main() -> graph_guard::error::Result<()> {
/// let index = MetadataIndex::builder()
///     .register(
///         TypeMetadata::builder("Person")
///             .property(
///                 PropertyMetadata::new("name")
///                     .constraint(ConstraintModel::leaf("NotBlank").build()?),
///             )
///             .build()?,
///     )
///     .build()?;
///
/// let key = LocationKey::property(TypeName::from("Person"), "name");
/// assert_eq!(index.constraints_at(&key).len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MetadataIndex {
    types: HashMap<TypeName, TypeMetadata>,
    locations: HashMap<LocationKey, Vec<Arc<ConstraintModel>>>,
    catalog: GroupCatalog,
}

impl MetadataIndex {
    /// Starts building an index.
    pub fn builder() -> MetadataIndexBuilder {
        MetadataIndexBuilder::default()
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Iterates over every constraint model in the index.
    pub fn all_constraints(&self) -> impl Iterator<Item = &Arc<ConstraintModel>> {
        self.locations.values().flatten()
    }
}

impl MetadataProvider for MetadataIndex {
    fn type_metadata(&self, type_name: &TypeName) -> Option<&TypeMetadata> {
        self.types.get(type_name)
    }

    fn catalog(&self) -> &GroupCatalog {
        &self.catalog
    }

    fn constraints_at(&self, key: &LocationKey) -> &[Arc<ConstraintModel>] {
        self.locations.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn cascading_locations_of(&self, type_name: &TypeName) -> Vec<LocationDescriptor> {
        let Some(metadata) = self.types.get(type_name) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for property in metadata.properties() {
            if property.cascades() {
                out.push(LocationDescriptor {
                    key: LocationKey::property(type_name.clone(), property.name()),
                    cascades: true,
                    group_conversions: property.group_conversions().clone(),
                });
            }
            for element in property.elements() {
                collect_cascading_elements(
                    type_name,
                    property.name(),
                    element,
                    &mut Vec::new(),
                    &mut out,
                );
            }
        }
        out
    }
}

fn collect_cascading_elements(
    type_name: &TypeName,
    property: &str,
    element: &ContainerElementMetadata,
    chain: &mut Vec<ContainerElementKind>,
    out: &mut Vec<LocationDescriptor>,
) {
    chain.push(element.kind());
    if element.cascades() {
        out.push(LocationDescriptor {
            key: LocationKey::element(type_name.clone(), property, chain.clone()),
            cascades: true,
            group_conversions: element.group_conversions().clone(),
        });
    }
    for nested in element.elements() {
        collect_cascading_elements(type_name, property, nested, chain, out);
    }
    chain.pop();
}

/// Builder for [`MetadataIndex`].
#[derive(Debug, Default)]
pub struct MetadataIndexBuilder {
    types: Vec<TypeMetadata>,
    catalog: GroupCatalog,
}

impl MetadataIndexBuilder {
    /// Registers the metadata of one type.
    pub fn register(mut self, metadata: TypeMetadata) -> Self {
        self.types.push(metadata);
        self
    }

    /// Sets the group catalog.
    pub fn catalog(mut self, catalog: GroupCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Checks all declarations and indexes every location.
    ///
    /// Fails on duplicate type registrations, on group sequence cycles
    /// (including cycles reached through a type's default sequence) and on
    /// constraints whose groups name a sequence.
    #[instrument(skip(self), fields(types = self.types.len()))]
    pub fn build(self) -> Result<MetadataIndex> {
        self.catalog.check()?;

        let mut types = HashMap::with_capacity(self.types.len());
        let mut locations: HashMap<LocationKey, Vec<Arc<ConstraintModel>>> = HashMap::new();

        for metadata in self.types {
            let type_name = metadata.type_name().clone();
            if types.contains_key(&type_name) {
                return Err(GuardError::Configuration(format!(
                    "type '{type_name}' is registered twice"
                )));
            }

            if let Some(sequence) = metadata.default_sequence() {
                let mut trail = vec![GroupId::Default];
                let flat = self.catalog.flatten(sequence, &mut trail)?;
                if flat.iter().any(GroupId::is_default) {
                    return Err(GuardError::GroupCycle {
                        cycle: vec![GroupId::Default, GroupId::Default],
                    });
                }
                debug!(
                    type_name = %type_name,
                    batches = flat.len(),
                    "Indexed default group sequence"
                );
            }

            let catalog = &self.catalog;
            metadata.for_each_constraint(&mut |key, model| {
                model.walk(&mut |m| {
                    if let Some(sequence) = m.groups().iter().find(|g| catalog.is_sequence(g)) {
                        return Err(GuardError::Configuration(format!(
                            "constraint '{}' on {key} declares sequence '{sequence}' as a group",
                            m.name()
                        )));
                    }
                    Ok(())
                })?;
                locations
                    .entry(key.clone())
                    .or_default()
                    .push(Arc::clone(model));
                Ok(())
            })?;

            types.insert(type_name, metadata);
        }

        info!(
            types = types.len(),
            locations = locations.len(),
            "Built metadata index"
        );

        Ok(MetadataIndex {
            types,
            locations,
            catalog: self.catalog,
        })
    }
}
