//! Prelude for commonly used types and traits in graph-guard.

pub use crate::constraints::{
    ClockProvider, ConstraintEvaluator, EvaluationContext, EvaluatorRegistry, FixedClock,
    SystemClock,
};
pub use crate::core::{
    CompositionRule, ConstraintModel, ContainerElementKind, ContainerElementMetadata,
    GroupCatalog, GroupId, Locale, MetadataIndex, ObjectGraph, ObjectId, Parameters,
    PropertyMetadata, PropertyPath, TypeMetadata, TypeName, ValidationOptions, Validator,
    ValidatorConfig, Value, Violation, ViolationSet,
};
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::formatters::{FormatterConfig, ResultFormatter, ValidationReport};
pub use crate::logging::LogConfig;
pub use crate::telemetry::{GuardSpan, GuardTelemetry};
