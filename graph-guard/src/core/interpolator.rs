//! Message interpolation.
//!
//! [`ParameterMessageInterpolator`] resolves `{key}` placeholders first from a
//! message bundle, then from the constraint's parameters, and resolves
//! `${validatedValue}` to the invalid value. Anything it cannot resolve is left
//! verbatim.

use super::constraint::ConstraintModel;
use super::value::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\$?\{([^{}]+)\}").expect("placeholder regex is valid")
});

// bundle messages may reference each other; bounded to stop self-references
const MAX_DEPTH: usize = 5;

/// Language tag used to select bundle messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale(Arc<str>);

impl Locale {
    /// Creates a locale from a tag such as `en` or `fr-CA`.
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag.
    pub fn tag(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`fr` for `fr-CA`).
    pub fn language(&self) -> &str {
        self.0.split(['-', '_']).next().unwrap_or(&self.0)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en")
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns a message template into the message of a violation.
///
/// Called once per violation that is actually kept, never during boolean
/// evaluation.
pub trait MessageInterpolator: fmt::Debug + Send + Sync {
    /// Produces the message for `template`.
    fn interpolate(
        &self,
        template: &str,
        constraint: &ConstraintModel,
        invalid_value: &Value,
        locale: &Locale,
    ) -> String;
}

fn builtin_messages() -> HashMap<String, String> {
    [
        ("NotNull.message", "must not be null"),
        ("Null.message", "must be null"),
        ("NotBlank.message", "must not be blank"),
        ("NotEmpty.message", "must not be empty"),
        ("Size.message", "size must be between {min} and {max}"),
        ("Min.message", "must be greater than or equal to {value}"),
        ("Max.message", "must be less than or equal to {value}"),
        ("Range.message", "must be between {min} and {max}"),
        ("Pattern.message", "must match \"{regexp}\""),
        ("AssertTrue.message", "must be true"),
        ("AssertFalse.message", "must be false"),
        ("Past.message", "must be a past date"),
        (
            "PastOrPresent.message",
            "must be a date in the past or in the present",
        ),
        ("Future.message", "must be a future date"),
        (
            "FutureOrPresent.message",
            "must be a date in the present or in the future",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Bundle-then-parameters interpolator.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{ConstraintModel, Locale, MessageInterpolator, ParameterMessageInterpolator, Value};
///
/// let interpolator = ParameterMessageInterpolator::new()
///     .with_locale_message(Locale::new("fr"), "NotNull.message", "ne doit pas être nul");
/// let model = ConstraintModel::leaf("Size").param("min", 2).param("max", 4).build().unwrap();
///
/// assert_eq!(
///     interpolator.interpolate("{Size.message}", &model, &Value::Null, &Locale::default()),
///     "size must be between 2 and 4"
/// );
/// assert_eq!(
///     interpolator.interpolate("'${validatedValue}' is {unknown}", &model, &Value::from("x"), &Locale::default()),
///     "'x' is {unknown}"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ParameterMessageInterpolator {
    bundle: HashMap<String, String>,
    localized: HashMap<String, HashMap<String, String>>,
}

impl Default for ParameterMessageInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterMessageInterpolator {
    /// Creates an interpolator whose bundle holds the built-in messages.
    pub fn new() -> Self {
        Self {
            bundle: builtin_messages(),
            localized: HashMap::new(),
        }
    }

    /// Adds or replaces a bundle message used for every locale.
    pub fn with_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.bundle.insert(key.into(), message.into());
        self
    }

    /// Adds a bundle message for one locale.
    ///
    /// Lookups try the full tag, then the language subtag, then the shared
    /// bundle.
    pub fn with_locale_message(
        mut self,
        locale: Locale,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.localized
            .entry(locale.tag().to_string())
            .or_default()
            .insert(key.into(), message.into());
        self
    }

    fn lookup(&self, key: &str, locale: &Locale) -> Option<&str> {
        [locale.tag(), locale.language()]
            .into_iter()
            .find_map(|tag| self.localized.get(tag).and_then(|b| b.get(key)))
            .or_else(|| self.bundle.get(key))
            .map(String::as_str)
    }

    fn render(
        &self,
        template: &str,
        constraint: &ConstraintModel,
        invalid_value: &Value,
        locale: &Locale,
        depth: usize,
    ) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                let whole = &caps[0];
                let key = caps[1].trim();

                if whole.starts_with('$') {
                    return match key {
                        "validatedValue" => invalid_value.to_string(),
                        _ => whole.to_string(),
                    };
                }

                if let Some(message) = self.lookup(key, locale) {
                    return if depth < MAX_DEPTH {
                        self.render(message, constraint, invalid_value, locale, depth + 1)
                    } else {
                        message.to_string()
                    };
                }

                match constraint.parameters().get(key) {
                    Some(value) => value.to_string(),
                    None => whole.to_string(),
                }
            })
            .into_owned()
    }
}

impl MessageInterpolator for ParameterMessageInterpolator {
    fn interpolate(
        &self,
        template: &str,
        constraint: &ConstraintModel,
        invalid_value: &Value,
        locale: &Locale,
    ) -> String {
        self.render(template, constraint, invalid_value, locale, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ConstraintModel {
        ConstraintModel::leaf("Min").param("value", 18).build().unwrap()
    }

    #[test]
    fn test_default_message_from_bundle_and_parameters() {
        let interpolator = ParameterMessageInterpolator::new();
        let m = model();
        assert_eq!(
            interpolator.interpolate(m.message_template(), &m, &Value::Int(3), &Locale::default()),
            "must be greater than or equal to 18"
        );
    }

    #[test]
    fn test_literal_template_untouched() {
        let interpolator = ParameterMessageInterpolator::new();
        assert_eq!(
            interpolator.interpolate("container", &model(), &Value::Null, &Locale::default()),
            "container"
        );
    }

    #[test]
    fn test_locale_fallback() {
        let interpolator = ParameterMessageInterpolator::new()
            .with_locale_message(Locale::new("fr"), "Min.message", "doit être au moins {value}");
        let m = model();

        assert_eq!(
            interpolator.interpolate("{Min.message}", &m, &Value::Null, &Locale::new("fr-CA")),
            "doit être au moins 18"
        );
        assert_eq!(
            interpolator.interpolate("{Min.message}", &m, &Value::Null, &Locale::new("de")),
            "must be greater than or equal to 18"
        );
    }

    #[test]
    fn test_self_referencing_bundle_terminates() {
        let interpolator = ParameterMessageInterpolator::new().with_message("loop", "{loop}");
        let out = interpolator.interpolate("{loop}", &model(), &Value::Null, &Locale::default());
        assert_eq!(out, "{loop}");
    }

    #[test]
    fn test_validated_value_and_unknown_expression() {
        let interpolator = ParameterMessageInterpolator::new();
        assert_eq!(
            interpolator.interpolate(
                "${validatedValue} / ${other}",
                &model(),
                &Value::Int(7),
                &Locale::default()
            ),
            "7 / ${other}"
        );
    }

    #[test]
    fn test_locale_language() {
        assert_eq!(Locale::new("pt_BR").language(), "pt");
        assert_eq!(Locale::default().tag(), "en");
    }
}
