//! Tracing subscriber setup
//!
//! The library only emits `tracing` events (targets `ragstream::stream`,
//! `ragstream::citation` and `ragstream::http`). Binaries and tests that want
//! to see them call [`init_tracing`] once.
//!
//! ```rust,ignore
//! use ragstream::observability::{init_tracing, OutputFormat, TracingConfig};
//!
//! init_tracing(TracingConfig::default())?;
//! init_tracing(TracingConfig::builder().log_level(tracing::Level::DEBUG).output_format(OutputFormat::Json).build())?;
//! ```

use crate::error::RagError;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_LEVEL: &str = "RAGSTREAM_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "RAGSTREAM_LOG_FORMAT";

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(RagError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: pretty, compact, json"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Let `RUST_LOG` override the crate-level filter.
    pub respect_rust_log: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Compact,
            respect_rust_log: true,
        }
    }
}

impl TracingConfig {
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Read `RAGSTREAM_LOG_LEVEL` and `RAGSTREAM_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, RagError> {
        let mut builder = Self::builder();
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            builder = builder.log_level_str(&level)?;
        }
        if let Ok(format) = std::env::var(ENV_LOG_FORMAT) {
            builder = builder.output_format(format.parse()?);
        }
        Ok(builder.build())
    }

    fn filter(&self) -> EnvFilter {
        let level = self.log_level.as_str().to_lowercase();
        let fallback = || EnvFilter::new(format!("ragstream={level}"));
        if self.respect_rust_log {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
        } else {
            fallback()
        }
    }
}

#[derive(Debug, Default)]
pub struct TracingConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    respect_rust_log: Option<bool>,
}

impl TracingConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_level_str(mut self, level: &str) -> Result<Self, RagError> {
        let level = level.trim().parse::<tracing::Level>().map_err(|_| {
            RagError::ConfigurationError(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn respect_rust_log(mut self, respect: bool) -> Self {
        self.respect_rust_log = Some(respect);
        self
    }

    pub fn build(self) -> TracingConfig {
        let defaults = TracingConfig::default();
        TracingConfig {
            log_level: self.log_level.unwrap_or(defaults.log_level),
            output_format: self.output_format.unwrap_or_default(),
            respect_rust_log: self.respect_rust_log.unwrap_or(defaults.respect_rust_log),
        }
    }
}

/// Install a global fmt subscriber. Calling it when a subscriber is already
/// installed is not an error.
pub fn init_tracing(config: TracingConfig) -> Result<(), RagError> {
    let filter = config.filter();
    let result = match config.output_format {
        OutputFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .pretty()
            .try_init(),
        OutputFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init(),
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .try_init(),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(RagError::ConfigurationError(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}
