//! OpenTelemetry integration following the BYOT (Bring Your Own Tracer) pattern.
//!
//! graph-guard never initializes an OpenTelemetry SDK. Callers configure their
//! own tracer and hand it to [`GuardTelemetry::new`]; the validator then emits:
//!
//! - one span per top-level call (`validate`, `validate_property`,
//!   `validate_value`),
//! - one span per plan batch,
//! - one span per constraint evaluation when `detailed_spans` is on.
//!
//! # Feature Gate
//!
//! Everything that touches OpenTelemetry is behind the `telemetry` feature.
//! Without it, [`GuardTelemetry`] and [`GuardSpan`] keep the same API and do
//! nothing.
//!
//! # Examples
//!
//! ```rust,ignore
//! use graph_guard::telemetry::GuardTelemetry;
//!
//! let tracer = opentelemetry::global::tracer("order-service");
//! let validator = Validator::builder(index)
//!     .telemetry(GuardTelemetry::new(tracer).with_attribute("env", "staging"))
//!     .build()?;
//! ```

#[cfg(feature = "telemetry")]
use opentelemetry::{
    global::{BoxedSpan, BoxedTracer},
    trace::{Span, Status, Tracer},
    KeyValue,
};

/// Telemetry configuration attached to a validator.
pub struct GuardTelemetry {
    #[cfg(feature = "telemetry")]
    tracer: BoxedTracer,

    /// Whether to open a span for every constraint evaluation
    pub detailed_spans: bool,

    /// Custom attributes to add to all spans
    pub custom_attributes: std::collections::HashMap<String, String>,
}

impl std::fmt::Debug for GuardTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardTelemetry")
            .field("detailed_spans", &self.detailed_spans)
            .field("custom_attributes", &self.custom_attributes)
            .finish()
    }
}

impl GuardTelemetry {
    /// Creates a telemetry configuration with a user-provided tracer.
    #[cfg(feature = "telemetry")]
    pub fn new(tracer: BoxedTracer) -> Self {
        Self {
            tracer,
            detailed_spans: false,
            custom_attributes: std::collections::HashMap::new(),
        }
    }

    /// Creates a disabled telemetry configuration.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "telemetry")]
            tracer: opentelemetry::global::tracer("noop"),
            detailed_spans: false,
            custom_attributes: std::collections::HashMap::new(),
        }
    }

    /// Sets whether to open a span for every constraint evaluation.
    pub fn with_detailed_spans(mut self, enabled: bool) -> Self {
        self.detailed_spans = enabled;
        self
    }

    /// Whether constraint evaluations get their own spans.
    pub fn detailed_spans(&self) -> bool {
        self.detailed_spans
    }

    /// Adds a custom attribute that will be added to all spans.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_attributes.insert(key.into(), value.into());
        self
    }

    /// Adds multiple custom attributes.
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in attributes {
            self.custom_attributes.insert(key.into(), value.into());
        }
        self
    }

    #[cfg(feature = "telemetry")]
    fn start(&self, name: String, attributes: Vec<KeyValue>) -> GuardSpan {
        let mut span = self.tracer.start(name);
        for kv in attributes {
            span.set_attribute(kv);
        }
        for (key, value) in &self.custom_attributes {
            span.set_attribute(KeyValue::new(key.clone(), value.clone()));
        }
        GuardSpan::new(span)
    }

    /// Opens the span of a top-level validation call.
    #[cfg(feature = "telemetry")]
    pub fn start_call_span(&self, operation: &str, root_type: &str) -> GuardSpan {
        self.start(
            format!("graph_guard.{operation}"),
            vec![
                KeyValue::new("validation.operation", operation.to_string()),
                KeyValue::new("validation.root_type", root_type.to_string()),
            ],
        )
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn start_call_span(&self, _operation: &str, _root_type: &str) -> GuardSpan {
        GuardSpan::noop()
    }

    /// Opens the span of one plan batch.
    #[cfg(feature = "telemetry")]
    pub fn start_batch_span(&self, groups: &str, sequence: bool) -> GuardSpan {
        self.start(
            "graph_guard.batch".to_string(),
            vec![
                KeyValue::new("validation.groups", groups.to_string()),
                KeyValue::new("validation.in_sequence", sequence),
            ],
        )
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn start_batch_span(&self, _groups: &str, _sequence: bool) -> GuardSpan {
        GuardSpan::noop()
    }

    /// Opens the span of one constraint evaluation, if detailed spans are on.
    #[cfg(feature = "telemetry")]
    pub fn start_constraint_span(&self, constraint: &str, path: &str) -> GuardSpan {
        if !self.detailed_spans {
            return GuardSpan::noop();
        }
        self.start(
            format!("graph_guard.constraint.{constraint}"),
            vec![
                KeyValue::new("validation.constraint.name", constraint.to_string()),
                KeyValue::new("validation.constraint.path", path.to_string()),
            ],
        )
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn start_constraint_span(&self, _constraint: &str, _path: &str) -> GuardSpan {
        GuardSpan::noop()
    }
}

impl Clone for GuardTelemetry {
    fn clone(&self) -> Self {
        Self {
            #[cfg(feature = "telemetry")]
            tracer: opentelemetry::global::tracer("noop"), // BoxedTracer is not Clone
            detailed_spans: self.detailed_spans,
            custom_attributes: self.custom_attributes.clone(),
        }
    }
}

/// A span that is a no-op when the `telemetry` feature is disabled.
pub struct GuardSpan {
    #[cfg(feature = "telemetry")]
    span: BoxedSpan,

    #[cfg(not(feature = "telemetry"))]
    _phantom: std::marker::PhantomData<()>,
}

impl GuardSpan {
    #[cfg(feature = "telemetry")]
    fn new(span: BoxedSpan) -> Self {
        Self { span }
    }

    /// Creates a no-op span.
    pub fn noop() -> Self {
        Self {
            #[cfg(feature = "telemetry")]
            span: opentelemetry::global::tracer("noop").start("noop"),
            #[cfg(not(feature = "telemetry"))]
            _phantom: std::marker::PhantomData,
        }
    }

    /// Records the number of violations produced under this span.
    #[cfg(feature = "telemetry")]
    pub fn record_violations(&mut self, count: usize) {
        self.span
            .set_attribute(KeyValue::new("validation.violations", count as i64));
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn record_violations(&mut self, _count: usize) {}

    /// Records the boolean outcome of a constraint evaluation.
    #[cfg(feature = "telemetry")]
    pub fn record_outcome(&mut self, valid: bool) {
        self.span
            .set_attribute(KeyValue::new("validation.constraint.valid", valid));
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn record_outcome(&mut self, _valid: bool) {}

    /// Records an error on this span.
    #[cfg(feature = "telemetry")]
    pub fn record_error(&mut self, error: &dyn std::error::Error) {
        self.span.record_error(error);
        self.span.set_status(Status::Error {
            description: error.to_string().into(),
        });
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn record_error(&mut self, _error: &dyn std::error::Error) {}
}

impl Drop for GuardSpan {
    #[cfg(feature = "telemetry")]
    fn drop(&mut self) {
        self.span.end();
    }

    #[cfg(not(feature = "telemetry"))]
    fn drop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_telemetry() {
        let telemetry = GuardTelemetry::disabled();
        assert!(!telemetry.detailed_spans);
        assert!(telemetry.custom_attributes.is_empty());
    }

    #[test]
    fn test_telemetry_configuration() {
        let telemetry = GuardTelemetry::disabled()
            .with_detailed_spans(true)
            .with_attribute("service.name", "orders")
            .with_attributes([("env", "test")]);

        assert!(telemetry.detailed_spans);
        assert_eq!(
            telemetry.custom_attributes.get("service.name"),
            Some(&"orders".to_string())
        );
        assert_eq!(telemetry.clone().custom_attributes.len(), 2);
    }

    #[test]
    fn test_noop_span_operations() {
        let telemetry = GuardTelemetry::disabled();
        let mut span = telemetry.start_call_span("validate", "Order");
        span.record_violations(3);
        span.record_outcome(false);
        span.record_error(&std::io::Error::new(std::io::ErrorKind::Other, "boom"));

        let _batch = telemetry.start_batch_span("[Default]", false);
        let _constraint = telemetry.start_constraint_span("NotNull", "name");
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn test_telemetry_with_noop_tracer() {
        let tracer = opentelemetry::global::tracer("test");
        let telemetry = GuardTelemetry::new(tracer).with_detailed_spans(true);
        let _call = telemetry.start_call_span("validate", "Order");
        let _constraint = telemetry.start_constraint_span("NotNull", "customer.name");
    }
}
