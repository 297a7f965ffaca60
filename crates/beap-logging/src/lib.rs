//! Structured JSONL logging for the BEAP package builder
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Build Correlation**: Every span opened during a build carries its build id
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use beap_logging::{BeapSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! let _guard = BeapSubscriberBuilder::new().init();
//!
//! // Development mode with pretty human-readable output
//! let _guard = BeapSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```
//!
//! Secrets never reach the log: the builder logs sizes, counts and short
//! fingerprints, never bodies or key material.

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{BuildContextData, BuildContextGuard};
pub use layers::{BuildContextExtension, BuildContextLayer};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid filter directive: {0}")]
    InvalidFilter(String),

    #[error("Log file error: {0}")]
    Io(String),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct BeapSubscriberBuilder {
    config: LogConfig,
}

impl Default for BeapSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BeapSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally, ignoring a previously installed one
    ///
    /// Returns the file writer guard, which must be kept alive for the
    /// duration of the program when file output is enabled.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!(error = %e, "Logging subscriber not installed");
                None
            }
        }
    }

    /// Initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.config.filter_directives())
                .map_err(|e| LogError::InvalidFilter(e.to_string()))?,
        };

        let jsonl = &self.config.jsonl;
        let console = &self.config.console;

        let pretty_console = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
        });

        let json_console = (console.enabled && !console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_thread_ids(jsonl.include_thread_info)
        });

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = create_file_writer(file_config)?;
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(jsonl.include_spans)
                    .flatten_event(jsonl.flatten_events)
                    .with_file(jsonl.include_location)
                    .with_line_number(jsonl.include_location)
                    .with_thread_ids(jsonl.include_thread_info)
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(BuildContextLayer::new())
            .with(pretty_console)
            .with(json_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

/// Create the file writer; `Never` truncates a single file, others roll
fn create_file_writer(file_config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    fs::create_dir_all(&file_config.directory).map_err(|e| LogError::Io(e.to_string()))?;

    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            let file_path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            let file = File::create(&file_path).map_err(|e| LogError::Io(e.to_string()))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_config.prefix.clone())
        .filename_suffix("jsonl");
    if let Some(max_files) = file_config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder
        .build(&file_config.directory)
        .map_err(|e| LogError::Io(e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}
