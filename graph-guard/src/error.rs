//! Error types for the graph-guard validation engine.
//!
//! All fatal conditions are represented by [`GuardError`]. Violations are not
//! errors: they are the normal output of a validation call and are returned in a
//! [`ViolationSet`](crate::core::ViolationSet).
//!
//! Errors fall into two families:
//!
//! - **Configuration errors** are detected eagerly, while the metadata index is
//!   built, while a validator is built, or while a group plan is resolved. They
//!   always surface before any traversal starts.
//! - **Evaluation faults** ([`GuardError::EvaluatorFault`], [`GuardError::AccessFault`])
//!   are raised mid-traversal and abort the whole call. No partial violation set
//!   is returned alongside them.

use crate::core::GroupId;
use thiserror::Error;

/// The main error type for graph-guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A group sequence (or a default-sequence override) references itself.
    #[error("Group sequence cycle detected: {}", format_cycle(.cycle))]
    GroupCycle {
        /// The groups forming the cycle, in resolution order
        cycle: Vec<GroupId>,
    },

    /// A composed constraint is structurally invalid.
    #[error("Malformed composition for constraint '{constraint}': {reason}")]
    MalformedComposition {
        /// Name of the offending constraint
        constraint: String,
        /// Why the composition was rejected
        reason: String,
    },

    /// A leaf constraint names an evaluator that is not registered.
    #[error("No evaluator registered for '{evaluator}' (used by constraint '{constraint}')")]
    UnknownEvaluator {
        /// Evaluator identifier
        evaluator: String,
        /// Constraint that references the evaluator
        constraint: String,
    },

    /// A constraint carries a parameter its evaluator cannot accept.
    #[error("Invalid parameter '{parameter}' for evaluator '{evaluator}': {reason}")]
    InvalidParameter {
        /// Evaluator identifier
        evaluator: String,
        /// Parameter name
        parameter: String,
        /// Why the parameter was rejected
        reason: String,
    },

    /// A property path names a property that has no metadata.
    #[error("Property '{property}' is not declared on type '{type_name}'")]
    UnknownProperty {
        /// Type that was searched
        type_name: String,
        /// Property that was not found
        property: String,
    },

    /// A property path string could not be parsed or navigated.
    #[error("Invalid property path '{path}': {reason}")]
    InvalidPropertyPath {
        /// The offending path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// The root value carries no type identity and none was supplied.
    #[error("Cannot determine the type of a root value that is not an object; use validate_as")]
    UntypedRoot,

    /// An evaluator failed unexpectedly. Always fatal.
    #[error("Evaluator '{evaluator}' failed: {message}")]
    EvaluatorFault {
        /// Evaluator identifier
        evaluator: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A property could not be read from an object. Always fatal.
    #[error("Cannot read property '{property}' of type '{type_name}': {message}")]
    AccessFault {
        /// Type of the object being read
        type_name: String,
        /// Property being read
        property: String,
        /// Detailed error message
        message: String,
    },

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when an operation is not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_cycle(cycle: &[GroupId]) -> String {
    cycle
        .iter()
        .map(|g| g.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A type alias for `Result<T, GuardError>`.
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Creates a new evaluator fault with the given message.
    pub fn evaluator_fault(evaluator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EvaluatorFault {
            evaluator: evaluator.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new evaluator fault wrapping an underlying error.
    pub fn evaluator_fault_with_source(
        evaluator: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::EvaluatorFault {
            evaluator: evaluator.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new property access fault.
    pub fn access_fault(
        type_name: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AccessFault {
            type_name: type_name.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// Creates a new malformed composition error.
    pub fn malformed(constraint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedComposition {
            constraint: constraint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid parameter error.
    pub fn invalid_parameter(
        evaluator: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            evaluator: evaluator.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors detected before traversal starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GuardError::GroupCycle { .. }
                | GuardError::MalformedComposition { .. }
                | GuardError::UnknownEvaluator { .. }
                | GuardError::InvalidParameter { .. }
                | GuardError::UnknownProperty { .. }
                | GuardError::InvalidPropertyPath { .. }
                | GuardError::UntypedRoot
                | GuardError::Configuration(_)
        )
    }

    /// Returns true for faults raised while traversing a graph.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            GuardError::EvaluatorFault { .. } | GuardError::AccessFault { .. }
        )
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| wrap(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(&f(), e.into()))
    }
}

// Faults keep their variant so callers can still classify them.
fn wrap(msg: &str, err: GuardError) -> GuardError {
    match err {
        GuardError::EvaluatorFault {
            evaluator,
            message,
            source,
        } => GuardError::EvaluatorFault {
            evaluator,
            message: format!("{msg}: {message}"),
            source,
        },
        GuardError::AccessFault {
            type_name,
            property,
            message,
        } => GuardError::AccessFault {
            type_name,
            property,
            message: format!("{msg}: {message}"),
        },
        GuardError::Internal(inner) => GuardError::Internal(format!("{msg}: {inner}")),
        other => GuardError::Internal(format!("{msg}: {other}")),
    }
}
