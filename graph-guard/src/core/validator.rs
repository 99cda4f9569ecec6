//! The public validation entry points.
//!
//! A [`Validator`] bundles an immutable metadata index with the pluggable
//! collaborators used during traversal: evaluators, property accessor,
//! message interpolator, traversable resolver and clock. It is cheap to clone
//! and can be shared across threads; every call builds its own
//! [`ValidationContext`].
//!
//! # Examples
//!
//! ```rust
//! use graph_guard::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> graph_guard::error::Result<()> {
//! let index = MetadataIndex::builder()
//!     .register(
//!         TypeMetadata::builder("User")
//!             .property(
//!                 PropertyMetadata::new("email")
//!                     .constraint(ConstraintModel::leaf("NotBlank").build()?),
//!             )
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let validator = Validator::builder(Arc::new(index)).build()?;
//!
//! let mut graph = ObjectGraph::new();
//! let user = graph.insert("User", [("email", Value::from(" "))]);
//!
//! let violations = validator.validate(&graph, &Value::Object(user), &ValidationOptions::new())?;
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations.as_slice()[0].property_path().to_string(), "email");
//! # Ok(())
//! # }
//! ```

use super::accessor::{FieldAccessor, PropertyAccessor};
use super::collector::ViolationCollector;
use super::composition::CompositionEvaluator;
use super::group::{GroupId, GroupSet};
use super::interpolator::{Locale, MessageInterpolator, ParameterMessageInterpolator};
use super::metadata::{MetadataIndex, MetadataProvider};
use super::path::PropertyPath;
use super::resolver::GroupResolver;
use super::traversable::{TraversableResolver, TraverseAll};
use super::traversal::{locate_bean, locate_type, Engine};
use super::validation_context::ValidationContext;
use super::value::{ObjectGraph, ObjectId, TypeName, Value};
use super::violation::ViolationSet;
use crate::constraints::{ClockProvider, EvaluatorRegistry, SystemClock};
use crate::error::{GuardError, Result};
use crate::logging::LogConfig;
use crate::telemetry::{GuardSpan, GuardTelemetry};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Validator-wide settings.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Stop at the first violation
    pub fail_fast: bool,
    /// Locale used when a call does not choose one
    pub default_locale: Locale,
    /// Logging of the hot paths
    pub log: LogConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            default_locale: Locale::default(),
            log: LogConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Low-overhead settings: fail fast, minimal logging.
    pub fn production() -> Self {
        Self {
            fail_fast: true,
            default_locale: Locale::default(),
            log: LogConfig::production(),
        }
    }

    /// Collects everything and logs every step.
    pub fn development() -> Self {
        Self {
            fail_fast: false,
            default_locale: Locale::default(),
            log: LogConfig::verbose(),
        }
    }

    /// Sets fail-fast mode.
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Sets the default locale.
    pub fn with_default_locale(mut self, locale: Locale) -> Self {
        self.default_locale = locale;
        self
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// Options of one validation call.
///
/// With no group, `Default` is validated. Unset overrides fall back to the
/// validator's [`ValidatorConfig`].
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    groups: GroupSet,
    fail_fast: Option<bool>,
    locale: Option<Locale>,
}

impl ValidationOptions {
    /// Validates `Default` with the validator's settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a group.
    pub fn group(mut self, group: impl Into<GroupId>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Requests several groups.
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

    /// Overrides fail-fast for this call.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = Some(enabled);
        self
    }

    /// Overrides the message locale for this call.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// The requested groups; empty means `Default`.
    pub fn requested_groups(&self) -> &GroupSet {
        &self.groups
    }
}

/// Validates object graphs against a [`MetadataIndex`].
#[derive(Clone)]
pub struct Validator {
    metadata: Arc<MetadataIndex>,
    registry: Arc<EvaluatorRegistry>,
    accessor: Arc<dyn PropertyAccessor>,
    interpolator: Arc<dyn MessageInterpolator>,
    traversable: Arc<dyn TraversableResolver>,
    clock: Arc<dyn ClockProvider>,
    config: ValidatorConfig,
    telemetry: Option<Arc<GuardTelemetry>>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("types", &self.metadata.type_count())
            .field("evaluators", &self.registry.len())
            .field("accessor", &self.accessor)
            .field("interpolator", &self.interpolator)
            .field("traversable", &self.traversable)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("telemetry", &self.telemetry.is_some())
            .finish()
    }
}

impl Validator {
    /// Starts building a validator over `metadata`.
    pub fn builder(metadata: Arc<MetadataIndex>) -> ValidatorBuilder {
        ValidatorBuilder::new(metadata)
    }

    /// Starts building a validator that shares this one's metadata and
    /// starts from its settings.
    pub fn using_context(&self) -> ValidatorBuilder {
        ValidatorBuilder {
            metadata: Arc::clone(&self.metadata),
            registry: Arc::clone(&self.registry),
            accessor: Arc::clone(&self.accessor),
            interpolator: Arc::clone(&self.interpolator),
            traversable: Arc::clone(&self.traversable),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            telemetry: self.telemetry.clone(),
        }
    }

    /// The metadata index.
    pub fn metadata(&self) -> &Arc<MetadataIndex> {
        &self.metadata
    }

    /// The validator-wide settings.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates `root` and everything reachable from it.
    ///
    /// The root type is taken from the graph; a root that is not an object
    /// needs [`validate_as`](Self::validate_as).
    pub fn validate(
        &self,
        graph: &ObjectGraph,
        root: &Value,
        options: &ValidationOptions,
    ) -> Result<ViolationSet> {
        let Value::Object(id) = root else {
            return Err(GuardError::UntypedRoot);
        };
        let root_type = self.type_of(graph, *id)?;
        self.validate_as(root_type, graph, root, options)
    }

    /// Validates `root` as an instance of `root_type`.
    ///
    /// A null root, or a root that is not an object, is still checked
    /// against the constraints declared on the type itself.
    #[instrument(skip_all, fields(
        validation.operation = "validate",
        validation.groups = %options.requested_groups()
    ))]
    pub fn validate_as(
        &self,
        root_type: impl Into<TypeName>,
        graph: &ObjectGraph,
        root: &Value,
        options: &ValidationOptions,
    ) -> Result<ViolationSet> {
        let root_type = root_type.into();
        let default_override = self
            .metadata
            .type_metadata(&root_type)
            .and_then(|m| m.default_sequence());

        self.execute(
            "validate",
            &root_type,
            root.clone(),
            Some(graph),
            default_override,
            options,
            |engine, ctx, groups| engine.validate_root(ctx, &root_type, root, groups),
        )
    }

    /// Validates one property of `root`, plus the cascades below it.
    ///
    /// `property_path` must end with a property, as in `customer.address.city`
    /// or `lines[0].sku`. A null met on the way yields no violation.
    #[instrument(skip(self, graph, options), fields(
        validation.operation = "validate_property",
        validation.groups = %options.requested_groups()
    ))]
    pub fn validate_property(
        &self,
        graph: &ObjectGraph,
        root: ObjectId,
        property_path: &str,
        options: &ValidationOptions,
    ) -> Result<ViolationSet> {
        let path = PropertyPath::parse(property_path)?;
        let root_type = self.type_of(graph, root)?;

        let Some((bean, bean_type)) =
            locate_bean(&*self.metadata, &*self.accessor, graph, root, &path)?
        else {
            debug!(path = %path, "Null on the way to the property, nothing to validate");
            return Ok(ViolationSet::new());
        };
        let (meta, property) = self.property_metadata(&bean_type, &path)?;
        let bean_path: PropertyPath = path.segments()[..path.len() - 1].iter().cloned().collect();

        self.execute(
            "validate_property",
            &root_type,
            Value::Object(root),
            Some(graph),
            meta.default_sequence(),
            options,
            |engine, ctx, groups| {
                engine.validate_property(ctx, bean, meta, property, &bean_path, groups)
            },
        )
    }

    /// Checks `candidate` against the constraints of the property at
    /// `property_path` of `root_type`, without an instance.
    ///
    /// Nothing is cascaded. Violations carry a null root value.
    #[instrument(skip(self, root_type, candidate, options), fields(
        validation.operation = "validate_value",
        validation.groups = %options.requested_groups()
    ))]
    pub fn validate_value(
        &self,
        root_type: impl Into<TypeName>,
        property_path: &str,
        candidate: &Value,
        options: &ValidationOptions,
    ) -> Result<ViolationSet> {
        let root_type = root_type.into();
        let path = PropertyPath::parse(property_path)?;
        let leaf_type = locate_type(&*self.metadata, &root_type, &path)?;
        let (meta, property) = self.property_metadata(&leaf_type, &path)?;

        self.execute(
            "validate_value",
            &root_type,
            Value::Null,
            None,
            meta.default_sequence(),
            options,
            |engine, ctx, groups| engine.validate_value(ctx, meta, property, candidate, &path, groups),
        )
    }

    fn type_of(&self, graph: &ObjectGraph, id: ObjectId) -> Result<TypeName> {
        graph
            .type_of(id)
            .cloned()
            .ok_or_else(|| GuardError::Configuration(format!("root object {id} is not in the graph")))
    }

    fn property_metadata<'m>(
        &'m self,
        type_name: &TypeName,
        path: &PropertyPath,
    ) -> Result<(&'m super::location::TypeMetadata, &'m super::location::PropertyMetadata)> {
        let name = path.leaf_property().unwrap_or_default();
        let unknown = || GuardError::UnknownProperty {
            type_name: type_name.to_string(),
            property: name.to_string(),
        };
        let meta = self.metadata.type_metadata(type_name).ok_or_else(unknown)?;
        let property = meta.property(name).ok_or_else(unknown)?;
        Ok((meta, property))
    }

    #[allow(clippy::too_many_arguments)]
    fn execute<F>(
        &self,
        operation: &'static str,
        root_type: &TypeName,
        root_value: Value,
        graph: Option<&ObjectGraph>,
        default_override: Option<&[GroupId]>,
        options: &ValidationOptions,
        pass: F,
    ) -> Result<ViolationSet>
    where
        F: FnMut(&Engine<'_>, &mut ValidationContext<'_>, &GroupSet) -> Result<()>,
    {
        let start = Instant::now();
        let mut span = match &self.telemetry {
            Some(t) => t.start_call_span(operation, root_type.as_str()),
            None => GuardSpan::noop(),
        };

        let result = self.run(root_type, root_value, graph, default_override, options, pass);

        match &result {
            Ok(violations) => {
                span.record_violations(violations.len());
                span.record_outcome(violations.is_empty());
                info!(
                    validation.operation = operation,
                    validation.root_type = %root_type,
                    validation.violations = violations.len(),
                    validation.duration_ms = start.elapsed().as_millis() as u64,
                    "Validation completed"
                );
            }
            Err(e) => {
                span.record_error(e);
                warn!(
                    validation.operation = operation,
                    validation.root_type = %root_type,
                    error = %e,
                    "Validation aborted"
                );
            }
        }
        result
    }

    fn run<F>(
        &self,
        root_type: &TypeName,
        root_value: Value,
        graph: Option<&ObjectGraph>,
        default_override: Option<&[GroupId]>,
        options: &ValidationOptions,
        pass: F,
    ) -> Result<ViolationSet>
    where
        F: FnMut(&Engine<'_>, &mut ValidationContext<'_>, &GroupSet) -> Result<()>,
    {
        let plan = GroupResolver::new(self.metadata.catalog())
            .resolve(options.requested_groups(), default_override)?;

        let fail_fast = options.fail_fast.unwrap_or(self.config.fail_fast);
        let locale = options.locale.as_ref().unwrap_or(&self.config.default_locale);
        let collector = ViolationCollector::new(
            root_type.clone(),
            root_value,
            fail_fast,
            &*self.interpolator,
            locale,
            &self.config.log,
        );
        let mut ctx = ValidationContext::new(graph, collector);

        let engine = Engine {
            metadata: &*self.metadata,
            accessor: &*self.accessor,
            traversable: &*self.traversable,
            composition: CompositionEvaluator::new(&self.registry, &*self.clock, &self.config.log),
            telemetry: self.telemetry.as_deref(),
            log: &self.config.log,
        };
        engine.run_plan(&mut ctx, &plan, pass)?;
        Ok(ctx.into_violations())
    }
}

/// Builds a [`Validator`], checking every constraint against the evaluator
/// registry before any call can be made.
pub struct ValidatorBuilder {
    metadata: Arc<MetadataIndex>,
    registry: Arc<EvaluatorRegistry>,
    accessor: Arc<dyn PropertyAccessor>,
    interpolator: Arc<dyn MessageInterpolator>,
    traversable: Arc<dyn TraversableResolver>,
    clock: Arc<dyn ClockProvider>,
    config: ValidatorConfig,
    telemetry: Option<Arc<GuardTelemetry>>,
}

impl ValidatorBuilder {
    fn new(metadata: Arc<MetadataIndex>) -> Self {
        Self {
            metadata,
            registry: Arc::new(EvaluatorRegistry::with_builtins()),
            accessor: Arc::new(FieldAccessor),
            interpolator: Arc::new(ParameterMessageInterpolator::new()),
            traversable: Arc::new(TraverseAll),
            clock: Arc::new(SystemClock),
            config: ValidatorConfig::default(),
            telemetry: None,
        }
    }

    /// Replaces the evaluator registry.
    pub fn registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Replaces the property accessor.
    pub fn accessor(mut self, accessor: impl PropertyAccessor + 'static) -> Self {
        self.accessor = Arc::new(accessor);
        self
    }

    /// Replaces the message interpolator.
    pub fn interpolator(mut self, interpolator: impl MessageInterpolator + 'static) -> Self {
        self.interpolator = Arc::new(interpolator);
        self
    }

    /// Replaces the traversable resolver.
    pub fn traversable(mut self, resolver: impl TraversableResolver + 'static) -> Self {
        self.traversable = Arc::new(resolver);
        self
    }

    /// Replaces the clock used by temporal evaluators.
    pub fn clock(mut self, clock: impl ClockProvider + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets fail-fast mode.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.config.fail_fast = enabled;
        self
    }

    /// Sets the default message locale.
    pub fn default_locale(mut self, locale: Locale) -> Self {
        self.config.default_locale = locale;
        self
    }

    /// Enables OpenTelemetry spans.
    pub fn telemetry(mut self, telemetry: GuardTelemetry) -> Self {
        self.telemetry = Some(Arc::new(telemetry));
        self
    }

    /// Checks every constraint of the index and builds the validator.
    ///
    /// Fails with [`GuardError::UnknownEvaluator`] when a leaf names an
    /// evaluator that is not registered, and with whatever the evaluator's
    /// parameter check returns when its parameters are unusable.
    #[instrument(skip(self), fields(
        validator.types = self.metadata.type_count(),
        validator.evaluators = self.registry.len()
    ))]
    pub fn build(self) -> Result<Validator> {
        let mut checked = 0usize;
        for model in self.metadata.all_constraints() {
            model.walk(&mut |m| {
                let Some(id) = m.evaluator() else {
                    return Ok(());
                };
                let evaluator = self.registry.get(id).ok_or_else(|| GuardError::UnknownEvaluator {
                    evaluator: id.to_string(),
                    constraint: m.name().to_string(),
                })?;
                evaluator.check_parameters(m.parameters())?;
                checked += 1;
                Ok(())
            })?;
        }

        info!(
            validator.constraints = checked,
            validator.fail_fast = self.config.fail_fast,
            validator.locale = %self.config.default_locale,
            "Built validator"
        );

        Ok(Validator {
            metadata: self.metadata,
            registry: self.registry,
            accessor: self.accessor,
            interpolator: self.interpolator,
            traversable: self.traversable,
            clock: self.clock,
            config: self.config,
            telemetry: self.telemetry,
        })
    }
}
