//! The traversal engine.
//!
//! For each batch of a [`ValidationPlan`] the engine walks the graph from the
//! root: it evaluates the constraints of each bean, then of each reachable
//! property and its container elements, and only then cascades into the
//! values marked for cascading. Cascading is skipped for null values and for
//! objects already entered on the current path.

use super::accessor::PropertyAccessor;
use super::collector::Failure;
use super::composition::CompositionEvaluator;
use super::constraint::ConstraintModel;
use super::group::{GroupId, GroupSet};
use super::location::{
    ContainerElementKind, ContainerElementMetadata, LocationKey, PropertyMetadata, TypeMetadata,
};
use super::metadata::MetadataProvider;
use super::path::{PathSegment, PropertyPath};
use super::resolver::{GroupResolver, PlanStep, ValidationPlan};
use super::traversable::TraversableResolver;
use super::validation_context::ValidationContext;
use super::value::{ObjectGraph, ObjectId, TypeName, Value};
use crate::error::{GuardError, Result};
use crate::logging::LogConfig;
use crate::telemetry::GuardTelemetry;
use crate::{log_traversal, perf_debug};
use indexmap::IndexMap;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Collaborators shared by every step of one call.
pub(crate) struct Engine<'a> {
    pub metadata: &'a dyn MetadataProvider,
    pub accessor: &'a dyn PropertyAccessor,
    pub traversable: &'a dyn TraversableResolver,
    pub composition: CompositionEvaluator<'a>,
    pub telemetry: Option<&'a GuardTelemetry>,
    pub log: &'a LogConfig,
}

/// Where a value sits while its constraints are evaluated.
#[derive(Clone, Copy)]
struct Site<'p> {
    path: &'p PropertyPath,
    leaf_bean: Option<ObjectId>,
}

impl<'a> Engine<'a> {
    /// Runs every step of `plan`, calling `pass` once per batch.
    ///
    /// Within a sequence, the first batch that adds a violation ends the
    /// sequence. Fail-fast ends everything.
    pub fn run_plan<F>(
        &self,
        ctx: &mut ValidationContext<'_>,
        plan: &ValidationPlan,
        mut pass: F,
    ) -> Result<()>
    where
        F: FnMut(&Self, &mut ValidationContext<'_>, &GroupSet) -> Result<()>,
    {
        for step in plan.steps() {
            if ctx.should_stop() {
                break;
            }
            match step {
                PlanStep::Batch(groups) => self.run_batch(ctx, groups, false, &mut pass)?,
                PlanStep::Sequence { name, batches } => {
                    for groups in batches {
                        if ctx.should_stop() {
                            break;
                        }
                        let before = ctx.violation_count();
                        self.run_batch(ctx, groups, true, &mut pass)?;
                        if ctx.violation_count() > before {
                            perf_debug!(
                                self.log,
                                sequence = %name,
                                failed_batch = %groups,
                                "Sequence stopped at failing batch"
                            );
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn run_batch<F>(
        &self,
        ctx: &mut ValidationContext<'_>,
        groups: &GroupSet,
        in_sequence: bool,
        pass: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&Self, &mut ValidationContext<'_>, &GroupSet) -> Result<()>,
    {
        let mut span = match self.telemetry {
            Some(t) => t.start_batch_span(&groups.to_string(), in_sequence),
            None => crate::telemetry::GuardSpan::noop(),
        };
        let before = ctx.violation_count();
        ctx.begin_pass();
        log_traversal!(self.log, pass = ctx.pass(), groups = %groups, "Starting batch");

        let result = pass(self, ctx, groups);
        match &result {
            Ok(()) => span.record_violations(ctx.violation_count() - before),
            Err(e) => span.record_error(e),
        }
        result
    }

    /// One batch of `validate`: the root value and everything below it.
    pub fn validate_root(
        &self,
        ctx: &mut ValidationContext<'_>,
        root_type: &TypeName,
        root: &Value,
        groups: &GroupSet,
    ) -> Result<()> {
        let path = PropertyPath::root();
        match root {
            Value::Object(id) => {
                ctx.enter_cascade(*id, &path);
                self.visit_bean(ctx, *id, root_type, groups, &path)
            }
            other => {
                let Some(meta) = self.metadata.type_metadata(root_type) else {
                    return Ok(());
                };
                let active = self.metadata.catalog().expand(groups);
                let site = Site {
                    path: &path,
                    leaf_bean: None,
                };
                let key = LocationKey::root(root_type.clone());
                self.check_all(ctx, meta, &key, other, site, groups, &active)
            }
        }
    }

    /// One batch of `validate_property`: a single property of `bean`, plus
    /// the cascades below it.
    pub fn validate_property(
        &self,
        ctx: &mut ValidationContext<'_>,
        bean: ObjectId,
        meta: &TypeMetadata,
        property: &PropertyMetadata,
        bean_path: &PropertyPath,
        groups: &GroupSet,
    ) -> Result<()> {
        ctx.enter_cascade(bean, bean_path);
        if !self
            .traversable
            .is_reachable(meta.type_name(), property.name(), bean_path)
        {
            return Ok(());
        }

        let active = self.metadata.catalog().expand(groups);
        let value = self.read(ctx, bean, meta.type_name(), property.name())?;
        let path = bean_path.property(property.name());
        let site = Site {
            path: &path,
            leaf_bean: Some(bean),
        };
        self.evaluate_property(ctx, meta, property, &value, site, groups, &active)?;

        if self
            .traversable
            .is_cascadable(meta.type_name(), property.name(), bean_path)
        {
            self.cascade_property(ctx, property, &value, groups, &path)?;
        }
        Ok(())
    }

    /// One batch of `validate_value`: the constraints of one property checked
    /// against a candidate value. Never cascades.
    pub fn validate_value(
        &self,
        ctx: &mut ValidationContext<'_>,
        meta: &TypeMetadata,
        property: &PropertyMetadata,
        candidate: &Value,
        path: &PropertyPath,
        groups: &GroupSet,
    ) -> Result<()> {
        let active = self.metadata.catalog().expand(groups);
        let site = Site {
            path,
            leaf_bean: None,
        };
        self.evaluate_property(ctx, meta, property, candidate, site, groups, &active)
    }

    fn visit_bean(
        &self,
        ctx: &mut ValidationContext<'_>,
        id: ObjectId,
        type_name: &TypeName,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        let Some(meta) = self.metadata.type_metadata(type_name) else {
            log_traversal!(self.log, type_name = %type_name, path = %path, "No metadata, nothing to check");
            return Ok(());
        };
        log_traversal!(self.log, type_name = %type_name, path = %path, groups = %groups, "Visiting bean");

        match meta.default_sequence() {
            Some(sequence) if groups.contains(&GroupId::DEFAULT) => {
                let batches = GroupResolver::new(self.metadata.catalog()).override_batches(sequence)?;
                for batch in &batches {
                    if ctx.should_stop() {
                        return Ok(());
                    }
                    let before = ctx.violation_count();
                    self.evaluate_locals(ctx, meta, id, batch, path)?;
                    if ctx.violation_count() > before {
                        break;
                    }
                }

                let others: GroupSet = groups.iter().filter(|g| !g.is_default()).cloned().collect();
                if !others.is_empty() {
                    self.evaluate_locals(ctx, meta, id, &others, path)?;
                }
            }
            _ => self.evaluate_locals(ctx, meta, id, groups, path)?,
        }

        self.cascade_bean(ctx, meta, id, groups, path)
    }

    fn evaluate_locals(
        &self,
        ctx: &mut ValidationContext<'_>,
        meta: &TypeMetadata,
        id: ObjectId,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        let active = self.metadata.catalog().expand(groups);
        let bean_site = Site {
            path,
            leaf_bean: Some(id),
        };
        let root = LocationKey::root(meta.type_name().clone());
        self.check_all(ctx, meta, &root, &Value::Object(id), bean_site, groups, &active)?;

        for property in meta.properties() {
            if ctx.should_stop() {
                return Ok(());
            }
            if !self.traversable.is_reachable(meta.type_name(), property.name(), path) {
                continue;
            }
            let value = self.read(ctx, id, meta.type_name(), property.name())?;
            let property_path = path.property(property.name());
            let site = Site {
                path: &property_path,
                leaf_bean: Some(id),
            };
            self.evaluate_property(ctx, meta, property, &value, site, groups, &active)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_property(
        &self,
        ctx: &mut ValidationContext<'_>,
        meta: &TypeMetadata,
        property: &PropertyMetadata,
        value: &Value,
        site: Site<'_>,
        groups: &GroupSet,
        active: &GroupSet,
    ) -> Result<()> {
        let key = LocationKey::property(meta.type_name().clone(), property.name());
        self.check_all(ctx, meta, &key, value, site, groups, active)?;
        for element in property.elements() {
            self.evaluate_elements(ctx, meta, &key, element, value, site, groups, active)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_elements(
        &self,
        ctx: &mut ValidationContext<'_>,
        meta: &TypeMetadata,
        parent: &LocationKey,
        element: &ContainerElementMetadata,
        container: &Value,
        site: Site<'_>,
        groups: &GroupSet,
        active: &GroupSet,
    ) -> Result<()> {
        let key = parent.nested(element.kind()).ok_or_else(|| {
            GuardError::Internal(format!("container element declared below {parent}"))
        })?;
        for (segment, item) in elements_of(element.kind(), container) {
            if ctx.should_stop() {
                return Ok(());
            }
            let path = site.path.child(segment);
            let item_site = Site {
                path: &path,
                leaf_bean: site.leaf_bean,
            };
            self.check_all(ctx, meta, &key, item, item_site, groups, active)?;
            for nested in element.elements() {
                self.evaluate_elements(ctx, meta, &key, nested, item, item_site, groups, active)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_all(
        &self,
        ctx: &mut ValidationContext<'_>,
        meta: &TypeMetadata,
        key: &LocationKey,
        value: &Value,
        site: Site<'_>,
        groups: &GroupSet,
        active: &GroupSet,
    ) -> Result<()> {
        for model in self.metadata.constraints_at(key) {
            if ctx.should_stop() {
                return Ok(());
            }
            if meta.is_active(model, active) {
                self.check(ctx, model, value, site, groups)?;
            }
        }
        Ok(())
    }

    fn check(
        &self,
        ctx: &mut ValidationContext<'_>,
        model: &Arc<ConstraintModel>,
        value: &Value,
        site: Site<'_>,
        groups: &GroupSet,
    ) -> Result<()> {
        let mut span = match self.telemetry {
            Some(t) if t.detailed_spans() => {
                t.start_constraint_span(model.name(), &site.path.to_string())
            }
            _ => crate::telemetry::GuardSpan::noop(),
        };

        let outcome = match self
            .composition
            .evaluate(model, value, site.path, ctx.graph())
        {
            Ok(outcome) => outcome,
            Err(e) => {
                span.record_error(&e);
                return Err(e);
            }
        };
        span.record_outcome(outcome.is_valid());

        for failed in outcome.failures() {
            let accepted = ctx.report(Failure {
                constraint: failed,
                invalid_value: value,
                path: site.path,
                leaf_bean: site.leaf_bean,
                groups,
            });
            if !accepted {
                break;
            }
        }
        Ok(())
    }

    fn cascade_bean(
        &self,
        ctx: &mut ValidationContext<'_>,
        meta: &TypeMetadata,
        id: ObjectId,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        let cascading = self.metadata.cascading_locations_of(meta.type_name());
        if cascading.is_empty() {
            return Ok(());
        }
        for property in meta.properties() {
            if ctx.should_stop() {
                return Ok(());
            }
            let cascades = cascading
                .iter()
                .any(|location| location.key.kind.property_name() == Some(property.name()));
            if !cascades {
                continue;
            }
            let type_name = meta.type_name();
            if !self.traversable.is_reachable(type_name, property.name(), path)
                || !self.traversable.is_cascadable(type_name, property.name(), path)
            {
                log_traversal!(self.log, property = property.name(), path = %path, "Cascade excluded by resolver");
                continue;
            }
            let value = self.read(ctx, id, type_name, property.name())?;
            self.cascade_property(ctx, property, &value, groups, &path.property(property.name()))?;
        }
        Ok(())
    }

    fn cascade_property(
        &self,
        ctx: &mut ValidationContext<'_>,
        property: &PropertyMetadata,
        value: &Value,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        if property.cascades() {
            let converted = convert_groups(groups, property.group_conversions());
            self.cascade_value(ctx, value, &converted, path)?;
        }
        for element in property.elements() {
            self.cascade_elements(ctx, element, value, groups, path)?;
        }
        Ok(())
    }

    fn cascade_elements(
        &self,
        ctx: &mut ValidationContext<'_>,
        element: &ContainerElementMetadata,
        container: &Value,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        if !has_cascade(element) {
            return Ok(());
        }
        for (segment, item) in elements_of(element.kind(), container) {
            if ctx.should_stop() {
                return Ok(());
            }
            let item_path = path.child(segment);
            if element.cascades() {
                let converted = convert_groups(groups, element.group_conversions());
                self.cascade_value(ctx, item, &converted, &item_path)?;
            }
            for nested in element.elements() {
                self.cascade_elements(ctx, nested, item, groups, &item_path)?;
            }
        }
        Ok(())
    }

    /// Cascades into an object, or into every object held by a container.
    fn cascade_value(
        &self,
        ctx: &mut ValidationContext<'_>,
        value: &Value,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        match value {
            Value::Object(id) => self.cascade_object(ctx, *id, groups, path),
            Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Optional(_) => {
                for (segment, item) in implicit_elements(value) {
                    if ctx.should_stop() {
                        return Ok(());
                    }
                    self.cascade_value(ctx, item, groups, &path.child(segment))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn cascade_object(
        &self,
        ctx: &mut ValidationContext<'_>,
        id: ObjectId,
        groups: &GroupSet,
        path: &PropertyPath,
    ) -> Result<()> {
        let graph = ctx.require_graph()?;
        let type_name = graph.type_of(id).ok_or_else(|| {
            GuardError::access_fault(
                "<unknown>",
                path.leaf_property().unwrap_or_default(),
                format!("no object {id} in graph"),
            )
        })?;

        if !ctx.enter_cascade(id, path) {
            log_traversal!(self.log, object = %id, path = %path, "Already visited on this path, skipping");
            return Ok(());
        }
        log_traversal!(self.log, object = %id, path = %path, groups = %groups, "Cascading");
        self.visit_bean(ctx, id, type_name, groups, path)
    }

    fn read(
        &self,
        ctx: &ValidationContext<'_>,
        id: ObjectId,
        type_name: &TypeName,
        property: &str,
    ) -> Result<Value> {
        let graph = ctx.require_graph()?;
        self.accessor
            .read(graph, id, property)
            .map_err(|e| access_error(e, type_name, property))
    }
}

fn access_error(err: GuardError, type_name: &TypeName, property: &str) -> GuardError {
    if err.is_fault() {
        err
    } else {
        GuardError::access_fault(type_name.as_str(), property, err.to_string())
    }
}

/// Type groups become `Default` at a cascade edge, then conversions apply.
fn convert_groups(groups: &GroupSet, conversions: &IndexMap<GroupId, GroupId>) -> GroupSet {
    let groups = groups.with_type_groups_as_default();
    if conversions.is_empty() {
        return groups;
    }
    groups
        .iter()
        .map(|g| conversions.get(g).unwrap_or(g).clone())
        .collect()
}

fn has_cascade(element: &ContainerElementMetadata) -> bool {
    element.cascades() || element.elements().iter().any(has_cascade)
}

/// The elements a declared container position addresses in `value`.
///
/// A runtime shape that does not match the declared position yields nothing.
pub(crate) fn elements_of(kind: ContainerElementKind, value: &Value) -> Vec<(PathSegment, &Value)> {
    match (kind, value) {
        (ContainerElementKind::Element, Value::List(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (PathSegment::Index(i), v))
            .collect(),
        (ContainerElementKind::Element, Value::Set(items)) => {
            items.iter().map(|v| (PathSegment::Element, v)).collect()
        }
        (ContainerElementKind::MapValue, Value::Map(entries)) => entries
            .iter()
            .map(|(k, v)| (PathSegment::Key(k.clone()), v))
            .collect(),
        (ContainerElementKind::MapKey, Value::Map(entries)) => entries
            .iter()
            .map(|(k, _)| (PathSegment::MapKey(k.clone()), k))
            .collect(),
        (ContainerElementKind::Unwrapped, Value::Optional(inner)) => {
            let content = inner.as_deref().unwrap_or(&NULL);
            vec![(PathSegment::Unwrapped, content)]
        }
        _ => Vec::new(),
    }
}

/// Elements descended into when a whole container cascades.
fn implicit_elements(value: &Value) -> Vec<(PathSegment, &Value)> {
    match value {
        Value::List(_) | Value::Set(_) => elements_of(ContainerElementKind::Element, value),
        Value::Map(_) => elements_of(ContainerElementKind::MapValue, value),
        Value::Optional(Some(inner)) => vec![(PathSegment::Unwrapped, inner.as_ref())],
        _ => Vec::new(),
    }
}

/// Resolves the bean that owns the last property of `path`, starting at
/// `root`.
///
/// Returns `None` when a null (or an empty wrapper) is met on the way.
pub(crate) fn locate_bean(
    metadata: &dyn MetadataProvider,
    accessor: &dyn PropertyAccessor,
    graph: &ObjectGraph,
    root: ObjectId,
    path: &PropertyPath,
) -> Result<Option<(ObjectId, TypeName)>> {
    let invalid = |reason: String| GuardError::InvalidPropertyPath {
        path: path.to_string(),
        reason,
    };
    let segments = path.segments();
    let Some((PathSegment::Property(_), parents)) = segments.split_last() else {
        return Err(invalid("the path must end with a property".to_string()));
    };

    let mut current = Value::Object(root);
    for segment in parents {
        current = unwrap_optional(current);
        if current.is_null() {
            return Ok(None);
        }
        current = match segment {
            PathSegment::Property(name) => {
                let id = current
                    .as_object()
                    .ok_or_else(|| invalid(format!("'{name}' is read from a {}", current.kind())))?;
                let type_name = graph
                    .type_of(id)
                    .ok_or_else(|| GuardError::access_fault("<unknown>", name.as_str(), format!("no object {id} in graph")))?;
                require_property(metadata, type_name, name)?;
                accessor
                    .read(graph, id, name)
                    .map_err(|e| access_error(e, type_name, name))?
            }
            PathSegment::Index(i) => match &current {
                Value::List(items) => items
                    .get(*i)
                    .cloned()
                    .ok_or_else(|| invalid(format!("index {i} is out of range")))?,
                other => return Err(invalid(format!("cannot index into a {}", other.kind()))),
            },
            PathSegment::Key(key) | PathSegment::MapKey(key) => {
                let Value::Map(entries) = &current else {
                    return Err(invalid(format!("cannot look up a key in a {}", current.kind())));
                };
                let (k, v) = entries
                    .iter()
                    .find(|(k, _)| keys_match(k, key))
                    .ok_or_else(|| invalid(format!("no entry for key {key}")))?;
                if matches!(segment, PathSegment::MapKey(_)) {
                    k.clone()
                } else {
                    v.clone()
                }
            }
            PathSegment::Element => {
                return Err(invalid("elements of an unordered container cannot be addressed".to_string()))
            }
            PathSegment::Unwrapped => current,
        };
    }

    match unwrap_optional(current) {
        Value::Null => Ok(None),
        Value::Object(id) => {
            let type_name = graph
                .type_of(id)
                .cloned()
                .ok_or_else(|| invalid(format!("no object {id} in graph")))?;
            Ok(Some((id, type_name)))
        }
        other => Err(invalid(format!("the property owner is a {}, not a bean", other.kind()))),
    }
}

/// Resolves, without an instance, the type declaring the last property of
/// `path` by following declared bean types.
pub(crate) fn locate_type(
    metadata: &dyn MetadataProvider,
    root_type: &TypeName,
    path: &PropertyPath,
) -> Result<TypeName> {
    let invalid = |reason: String| GuardError::InvalidPropertyPath {
        path: path.to_string(),
        reason,
    };
    let segments = path.segments();
    let Some((PathSegment::Property(_), parents)) = segments.split_last() else {
        return Err(invalid("the path must end with a property".to_string()));
    };

    let mut bean_type = root_type.clone();
    let mut i = 0;
    while i < parents.len() {
        let PathSegment::Property(name) = &parents[i] else {
            return Err(invalid("a container element must follow a property".to_string()));
        };
        let property = require_property(metadata, &bean_type, name)?;
        let mut declared = property.declared_bean_type();
        let mut elements = property.elements();
        i += 1;

        while i < parents.len() && parents[i].is_container_element() {
            let wanted: &[ContainerElementKind] = match &parents[i] {
                PathSegment::Index(_) | PathSegment::Element => &[ContainerElementKind::Element],
                PathSegment::Key(_) => &[ContainerElementKind::MapValue],
                PathSegment::MapKey(_) => &[ContainerElementKind::MapKey],
                PathSegment::Unwrapped | PathSegment::Property(_) => {
                    &[ContainerElementKind::Unwrapped]
                }
            };
            let element = elements
                .iter()
                .find(|e| wanted.contains(&e.kind()))
                .ok_or_else(|| invalid(format!("'{name}' declares no matching container element")))?;
            declared = element.declared_bean_type();
            elements = element.elements();
            i += 1;
        }

        bean_type = declared
            .cloned()
            .ok_or_else(|| invalid(format!("'{name}' does not declare a bean type")))?;
    }
    Ok(bean_type)
}

fn require_property<'m>(
    metadata: &'m dyn MetadataProvider,
    type_name: &TypeName,
    property: &str,
) -> Result<&'m PropertyMetadata> {
    metadata
        .type_metadata(type_name)
        .and_then(|meta| meta.property(property))
        .ok_or_else(|| GuardError::UnknownProperty {
            type_name: type_name.to_string(),
            property: property.to_string(),
        })
}

fn unwrap_optional(value: Value) -> Value {
    match value {
        Value::Optional(Some(inner)) => unwrap_optional(*inner),
        Value::Optional(None) => Value::Null,
        other => other,
    }
}

fn keys_match(actual: &Value, wanted: &Value) -> bool {
    actual == wanted || actual.to_string() == wanted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{EvaluatorRegistry, SystemClock};
    use crate::core::{
        ContainerElementMetadata, FieldAccessor, GroupCatalog, Locale, LocationDescriptor,
        MetadataIndex, ParameterMessageInterpolator, TraverseAll, ViolationCollector,
    };
    use std::sync::Mutex;

    /// Records every location lookup made against the wrapped index.
    struct RecordingProvider {
        index: MetadataIndex,
        lookups: Mutex<Vec<String>>,
    }

    impl MetadataProvider for RecordingProvider {
        fn type_metadata(&self, type_name: &TypeName) -> Option<&TypeMetadata> {
            self.index.type_metadata(type_name)
        }

        fn catalog(&self) -> &GroupCatalog {
            self.index.catalog()
        }

        fn constraints_at(&self, key: &LocationKey) -> &[Arc<ConstraintModel>] {
            self.lookups.lock().unwrap().push(key.to_string());
            self.index.constraints_at(key)
        }

        fn cascading_locations_of(&self, type_name: &TypeName) -> Vec<LocationDescriptor> {
            self.lookups.lock().unwrap().push(format!("{type_name}::cascades"));
            self.index.cascading_locations_of(type_name)
        }
    }

    fn leaf(evaluator: &str) -> ConstraintModel {
        ConstraintModel::leaf(evaluator).build().unwrap()
    }

    #[test]
    fn test_constraints_and_cascades_come_from_provider() {
        let index = MetadataIndex::builder()
            .register(
                TypeMetadata::builder("Order")
                    .property(
                        PropertyMetadata::new("customer")
                            .constraint(leaf("NotNull"))
                            .cascade(),
                    )
                    .property(PropertyMetadata::new("tags").element(
                        ContainerElementMetadata::new(ContainerElementKind::Element)
                            .constraint(leaf("NotBlank")),
                    ))
                    .build()
                    .unwrap(),
            )
            .register(
                TypeMetadata::builder("Customer")
                    .property(PropertyMetadata::new("email").constraint(leaf("NotBlank")))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let provider = RecordingProvider {
            index,
            lookups: Mutex::new(Vec::new()),
        };

        let mut graph = ObjectGraph::new();
        let customer = graph.insert("Customer", [("email", Value::from(""))]);
        let order = graph.insert(
            "Order",
            [
                ("customer", Value::Object(customer)),
                ("tags", Value::List(vec![Value::from(""), Value::from("vip")])),
            ],
        );

        let registry = EvaluatorRegistry::with_builtins();
        let log = LogConfig::default();
        let interpolator = ParameterMessageInterpolator::new();
        let locale = Locale::default();
        let engine = Engine {
            metadata: &provider,
            accessor: &FieldAccessor,
            traversable: &TraverseAll,
            composition: CompositionEvaluator::new(&registry, &SystemClock, &log),
            telemetry: None,
            log: &log,
        };
        let collector = ViolationCollector::new(
            TypeName::from("Order"),
            Value::Object(order),
            false,
            &interpolator,
            &locale,
            &log,
        );
        let mut ctx = ValidationContext::new(Some(&graph), collector);
        ctx.begin_pass();
        engine
            .validate_root(
                &mut ctx,
                &TypeName::from("Order"),
                &Value::Object(order),
                &GroupSet::default_only(),
            )
            .unwrap();

        let mut paths: Vec<String> = ctx
            .into_violations()
            .iter()
            .map(|v| v.property_path().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["customer.email", "tags[0]"]);

        let lookups = provider.lookups.lock().unwrap();
        for expected in [
            "Order::<root>",
            "Order::customer",
            "Order::tags<element>",
            "Order::cascades",
            "Customer::<root>",
            "Customer::email",
            "Customer::cascades",
        ] {
            assert!(lookups.iter().any(|l| l == expected), "missing lookup {expected}");
        }
    }

    #[test]
    fn test_elements_of_shapes() {
        let list = Value::List(vec![Value::from(1), Value::from(2)]);
        let segments: Vec<PathSegment> = elements_of(ContainerElementKind::Element, &list)
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(segments, vec![PathSegment::Index(0), PathSegment::Index(1)]);

        let map = Value::Map(vec![(Value::from("a"), Value::from(1))]);
        let keys = elements_of(ContainerElementKind::MapKey, &map);
        assert_eq!(keys[0].1, &Value::from("a"));
        let values = elements_of(ContainerElementKind::MapValue, &map);
        assert_eq!(values[0].1, &Value::from(1));

        let none = Value::none();
        let empty = elements_of(ContainerElementKind::Unwrapped, &none);
        assert_eq!(empty, vec![(PathSegment::Unwrapped, &Value::Null)]);

        assert!(elements_of(ContainerElementKind::Unwrapped, &Value::Null).is_empty());
        assert!(elements_of(ContainerElementKind::MapValue, &list).is_empty());
    }

    #[test]
    fn test_group_conversion_at_cascade_edge() {
        let groups: GroupSet = [GroupId::for_type("Order"), GroupId::new("Billing")]
            .into_iter()
            .collect();
        let mut conversions = IndexMap::new();
        conversions.insert(GroupId::DEFAULT, GroupId::new("Customer"));

        let converted = convert_groups(&groups, &conversions);
        assert_eq!(converted.to_string(), "[Customer, Billing]");
    }

    #[test]
    fn test_unwrap_optional_nested() {
        let value = Value::some(Value::some(Value::from("x")));
        assert_eq!(unwrap_optional(value), Value::from("x"));
        assert_eq!(unwrap_optional(Value::some(Value::none())), Value::Null);
    }
}
