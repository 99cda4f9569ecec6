//! Rendering of violation sets for people and machines.
//!
//! A [`ViolationSet`] is converted into a serializable [`ValidationReport`],
//! which the formatters then render as JSON, console text or Markdown.
//!
//! # Examples
//!
//! ```rust
//! use graph_guard::core::ViolationSet;
//! use graph_guard::formatters::{HumanFormatter, ResultFormatter, FormatterConfig};
//!
//! let formatter = HumanFormatter::with_config(FormatterConfig::minimal());
//! let output = formatter.format(&ViolationSet::new()).unwrap();
//! assert!(output.contains("Validation PASSED"));
//! ```

use crate::core::{Violation, ViolationSet};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Configuration options for rendering violations.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the summary block (root type, counts)
    pub include_summary: bool,
    /// Include individual violations
    pub include_violations: bool,
    /// Include the rejected value of each violation
    pub include_invalid_values: bool,
    /// Maximum number of violations to display (-1 for all)
    pub max_violations: i32,
    /// Whether to use colorized output (human formatter only)
    pub use_colors: bool,
    /// Whether to include the report timestamp
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_violations: true,
            include_invalid_values: true,
            max_violations: -1,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only the summary.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_violations: false,
            include_invalid_values: false,
            max_violations: 0,
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a detailed configuration showing everything.
    pub fn detailed() -> Self {
        Self::default()
    }

    /// Creates a configuration suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_summary: true,
            include_violations: true,
            include_invalid_values: false,
            max_violations: 50,
            use_colors: false,
            include_timestamps: true,
        }
    }

    /// Sets whether to include the summary block.
    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    /// Sets whether to include individual violations.
    pub fn with_violations(mut self, include: bool) -> Self {
        self.include_violations = include;
        self
    }

    /// Sets whether to include rejected values.
    pub fn with_invalid_values(mut self, include: bool) -> Self {
        self.include_invalid_values = include;
        self
    }

    /// Sets the maximum number of violations to display.
    pub fn with_max_violations(mut self, max: i32) -> Self {
        self.max_violations = max;
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn limit(&self, total: usize) -> usize {
        if self.max_violations < 0 {
            total
        } else {
            total.min(self.max_violations as usize)
        }
    }
}

/// Outcome of a validation call as recorded in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Passed,
    Failed,
}

/// One violation, flattened for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Rendered property path; empty for the root
    pub path: String,
    pub message: String,
    pub message_template: String,
    /// Name of the failing constraint
    pub constraint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_value: Option<String>,
    pub groups: Vec<String>,
}

impl From<&Violation> for ReportEntry {
    fn from(violation: &Violation) -> Self {
        Self {
            path: violation.property_path().to_string(),
            message: violation.message().to_string(),
            message_template: violation.message_template().to_string(),
            constraint: violation.constraint().name().to_string(),
            invalid_value: Some(violation.invalid_value().to_string()),
            groups: violation.groups().iter().map(|g| g.to_string()).collect(),
        }
    }
}

/// Serializable snapshot of a [`ViolationSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ReportStatus,
    /// Type the call was made against; unknown when nothing failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_type: Option<String>,
    pub total_violations: usize,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    pub violations: Vec<ReportEntry>,
}

impl ValidationReport {
    /// Builds a report from the violations of one call.
    pub fn from_violations(violations: &ViolationSet) -> Self {
        let entries: Vec<ReportEntry> = violations.iter().map(ReportEntry::from).collect();
        Self {
            status: if entries.is_empty() {
                ReportStatus::Passed
            } else {
                ReportStatus::Failed
            },
            root_type: violations
                .iter()
                .next()
                .map(|v| v.root_type().to_string()),
            total_violations: entries.len(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            violations: entries,
        }
    }

    /// Returns true if the report carries no violations.
    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Passed
    }

    /// Applies a formatter configuration, dropping what it excludes.
    ///
    /// `total_violations` keeps the unfiltered count.
    pub fn filtered(&self, config: &FormatterConfig) -> Self {
        let mut report = self.clone();
        if !config.include_violations {
            report.violations.clear();
        } else {
            report.violations.truncate(config.limit(self.violations.len()));
        }
        if !config.include_invalid_values {
            for entry in &mut report.violations {
                entry.invalid_value = None;
            }
        }
        if !config.include_timestamps {
            report.timestamp = String::new();
        }
        report
    }
}

impl From<&ViolationSet> for ValidationReport {
    fn from(violations: &ViolationSet) -> Self {
        Self::from_violations(violations)
    }
}

/// Trait for rendering violation sets into different output formats.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::ViolationSet;
/// use graph_guard::formatters::ResultFormatter;
///
/// struct CountFormatter;
///
/// impl ResultFormatter for CountFormatter {
///     fn format(&self, violations: &ViolationSet) -> graph_guard::prelude::Result<String> {
///         Ok(format!("{} violation(s)", violations.len()))
///     }
/// }
///
/// assert_eq!(CountFormatter.format(&ViolationSet::new()).unwrap(), "0 violation(s)");
/// ```
pub trait ResultFormatter {
    /// Renders the violations with the formatter's own configuration.
    fn format(&self, violations: &ViolationSet) -> Result<String>;

    /// Renders the violations with a caller-supplied configuration.
    fn format_with_config(
        &self,
        violations: &ViolationSet,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(violations)
    }
}

fn render_error(e: fmt::Error) -> GuardError {
    GuardError::Internal(format!("Failed to render report: {e}"))
}

/// Renders violations as structured JSON.
///
/// ```rust
/// use graph_guard::core::ViolationSet;
/// use graph_guard::formatters::{JsonFormatter, ResultFormatter};
///
/// let json = JsonFormatter::new().with_pretty(false).format(&ViolationSet::new()).unwrap();
/// assert!(json.contains("\"status\":\"passed\""));
/// ```
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    /// Creates a new JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, violations: &ViolationSet) -> Result<String> {
        self.format_with_config(violations, &self.config)
    }

    fn format_with_config(
        &self,
        violations: &ViolationSet,
        config: &FormatterConfig,
    ) -> Result<String> {
        let report = ValidationReport::from_violations(violations).filtered(config);
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };
        rendered.map_err(|e| GuardError::Serialization(format!("Failed to serialize report: {e}")))
    }
}

/// Renders violations for console output.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a new human formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    /// Creates a new human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
        out: &mut String,
    ) -> fmt::Result {
        let paint = |code: &str, text: &str| {
            if config.use_colors {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        writeln!(out)?;
        if report.is_success() {
            writeln!(out, "✅ {}", paint("32", "Validation PASSED"))?;
        } else {
            writeln!(out, "❌ {}", paint("31", "Validation FAILED"))?;
        }

        if config.include_summary {
            writeln!(out)?;
            if let Some(root_type) = &report.root_type {
                writeln!(out, "Root Type: {root_type}")?;
            }
            writeln!(
                out,
                "Violations: {}",
                paint("31", &report.total_violations.to_string())
            )?;
        }
        if config.include_timestamps && !report.timestamp.is_empty() {
            writeln!(out, "Timestamp: {}", report.timestamp)?;
        }

        if config.include_violations && !report.violations.is_empty() {
            writeln!(out)?;
            writeln!(out, "🔍 Violations:")?;
            for (i, entry) in report.violations.iter().enumerate() {
                let path = if entry.path.is_empty() {
                    "<root>"
                } else {
                    entry.path.as_str()
                };
                writeln!(out)?;
                writeln!(out, "   #{} {}", i + 1, paint("33", path))?;
                writeln!(out, "      Constraint: {}", entry.constraint)?;
                writeln!(out, "      Message: {}", entry.message)?;
                if let Some(value) = &entry.invalid_value {
                    writeln!(out, "      Value: {value}")?;
                }
                if !entry.groups.is_empty() {
                    writeln!(out, "      Groups: {}", entry.groups.join(", "))?;
                }
            }
        }

        let hidden = report.total_violations - report.violations.len();
        if config.include_violations && hidden > 0 {
            writeln!(out)?;
            writeln!(out, "   ... and {hidden} more violations")?;
        }

        writeln!(out)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, violations: &ViolationSet) -> Result<String> {
        self.format_with_config(violations, &self.config)
    }

    fn format_with_config(
        &self,
        violations: &ViolationSet,
        config: &FormatterConfig,
    ) -> Result<String> {
        let report = ValidationReport::from_violations(violations).filtered(config);
        let mut output = String::new();
        self.render(&report, config, &mut output)
            .map_err(render_error)?;
        Ok(output)
    }
}

/// Renders violations as Markdown, e.g. for CI comments.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    /// Creates a new Markdown formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    /// Creates a new Markdown formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn render(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
        out: &mut String,
    ) -> fmt::Result {
        let h = "#".repeat(self.heading_level as usize);

        if report.is_success() {
            writeln!(out, "{h} ✅ Validation Report - PASSED")?;
        } else {
            writeln!(out, "{h} ❌ Validation Report - FAILED")?;
        }

        if config.include_summary {
            writeln!(out)?;
            if let Some(root_type) = &report.root_type {
                writeln!(out, "**Root Type:** {root_type}")?;
            }
            writeln!(out, "**Violations:** {}", report.total_violations)?;
        }
        if config.include_timestamps && !report.timestamp.is_empty() {
            writeln!(out, "**Timestamp:** {}", report.timestamp)?;
        }

        if config.include_violations && !report.violations.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Violations")?;
            writeln!(out)?;
            if config.include_invalid_values {
                writeln!(out, "| Path | Constraint | Message | Value |")?;
                writeln!(out, "|------|------------|---------|-------|")?;
            } else {
                writeln!(out, "| Path | Constraint | Message |")?;
                writeln!(out, "|------|------------|---------|")?;
            }
            for entry in &report.violations {
                let path = if entry.path.is_empty() {
                    "*(root)*".to_string()
                } else {
                    format!("`{}`", entry.path)
                };
                let message = escape_cell(&entry.message);
                match (&entry.invalid_value, config.include_invalid_values) {
                    (Some(value), true) => writeln!(
                        out,
                        "| {path} | {} | {message} | `{}` |",
                        entry.constraint,
                        escape_cell(value)
                    )?,
                    (None, true) => {
                        writeln!(out, "| {path} | {} | {message} | |", entry.constraint)?
                    }
                    _ => writeln!(out, "| {path} | {} | {message} |", entry.constraint)?,
                }
            }

            let hidden = report.total_violations - report.violations.len();
            if hidden > 0 {
                writeln!(out)?;
                writeln!(
                    out,
                    "> **Note:** {hidden} additional violations not shown in this report."
                )?;
            }
        }

        Ok(())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, violations: &ViolationSet) -> Result<String> {
        self.format_with_config(violations, &self.config)
    }

    fn format_with_config(
        &self,
        violations: &ViolationSet,
        config: &FormatterConfig,
    ) -> Result<String> {
        let report = ValidationReport::from_violations(violations).filtered(config);
        let mut output = String::new();
        self.render(&report, config, &mut output)
            .map_err(render_error)?;
        Ok(output)
    }
}
