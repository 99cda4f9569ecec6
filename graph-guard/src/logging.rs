//! Logging configuration for the validation engine.
//!
//! Traversal and constraint evaluation are hot paths, so the detailed events
//! they emit are gated by [`LogConfig`] flags through the
//! [`log_constraint!`](crate::log_constraint) and
//! [`log_traversal!`](crate::log_traversal) macros.

use tracing::Level;

/// Which engine events a validator emits.
///
/// The flags are read on every visited location, so keep them off in hot
/// deployments.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level at and above which `perf_debug!` fires
    pub base_level: Level,
    /// Whether to log each constraint evaluation
    pub log_constraint_details: bool,
    /// Whether to log location visits, cascades and cycle skips
    pub log_traversal: bool,
    /// Whether to log each violation as it is collected
    pub log_violations: bool,
    /// Longest rendered value written to a log field
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_constraint_details: false,
            log_traversal: false,
            log_violations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Every event, with long values.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_constraint_details: true,
            log_traversal: true,
            log_violations: true,
            max_field_length: 1024,
        }
    }

    /// Warnings and call summaries only.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_constraint_details: false,
            log_traversal: false,
            log_violations: false,
            max_field_length: 128,
        }
    }

    /// Same as [`LogConfig::default`]: call summaries plus collected violations.
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Debug event emitted only when the config's base level admits DEBUG.
///
/// Arguments are not formatted otherwise.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Debug event gated by [`LogConfig::log_constraint_details`].
#[macro_export]
macro_rules! log_constraint {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_constraint_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Debug event gated by [`LogConfig::log_traversal`].
#[macro_export]
macro_rules! log_traversal {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_traversal {
            tracing::debug!($($arg)*);
        }
    };
}

/// Cuts `value` after `max_length` characters.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        None => value.to_string(),
        Some((cut, _)) => format!("{}...(truncated)", &value[..cut]),
    }
}

/// Global subscriber installation for binaries and tests.
pub mod setup {
    use tracing::Level;

    /// Subscriber settings.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for every other target
        pub level: Level,
        /// Log level for graph-guard components specifically
        pub guard_level: Level,
        /// Emit one JSON object per event
        pub json_format: bool,
        /// Replaces the generated filter when set
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                guard_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output, graph-guard at INFO.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                guard_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Human output, everything at DEBUG.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                guard_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the level for other targets.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for graph-guard components.
        pub fn with_guard_level(mut self, level: Level) -> Self {
            self.guard_level = level;
            self
        }

        /// Switches JSON output on or off.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Uses `filter` verbatim as the env filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The filter directive, e.g. `info,graph_guard=debug`.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},graph_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.guard_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Initializes the global subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use graph_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
