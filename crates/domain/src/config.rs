//! Configuration structures
//!
//! Plain serde data; every field has a default so partial files are valid.
//! Durations are stored as integer milliseconds (or seconds where noted) so
//! the same structs round-trip through TOML, JSON and environment variables.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{RecurError, Result};
use crate::impl_label_conversions;
use crate::types::PatternConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub reporter: ReporterSettings,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check cross-field constraints that serde cannot express
    ///
    /// # Errors
    /// Returns `RecurError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.executor.validate()?;
        self.retry.validate()?;
        self.circuit_breaker.validate()?;
        self.reporter.validate()?;
        Ok(())
    }
}

/// How commands are run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub timeout_ms: u64,
    /// Forward output lines as they are read
    pub streaming: bool,
    /// Suppress forwarding entirely
    pub quiet: bool,
    /// Prefix forwarded stderr lines with `[stderr]`
    pub verbose: bool,
    /// Prepended to every forwarded line
    pub output_prefix: Option<String>,
    pub patterns: Option<PatternConfig>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_EXECUTOR_TIMEOUT_MS,
            streaming: false,
            quiet: false,
            verbose: false,
            output_prefix: None,
            patterns: None,
        }
    }
}

impl ExecutorConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(RecurError::Config("executor.timeout_ms must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Backoff strategy selected in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    #[default]
    Exponential,
    Linear,
    Fixed,
    /// Run once, never retry
    None,
}

impl_label_conversions!(RetryStrategy {
    Exponential => "exponential",
    Linear => "linear",
    Fixed => "fixed",
    None => "none",
});

/// Retry policy settings
///
/// `initial_delay_ms` is the constant delay for the `fixed` strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub strategy: RetryStrategy,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub increment_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Exponential,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            increment_ms: DEFAULT_LINEAR_INCREMENT_MS,
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<()> {
        if self.strategy == RetryStrategy::Exponential {
            if !self.multiplier.is_finite() || self.multiplier < 1.0 {
                return Err(RecurError::Config(format!(
                    "retry.multiplier must be a finite number >= 1.0, got {}",
                    self.multiplier
                )));
            }
            if self.max_delay_ms < self.initial_delay_ms {
                return Err(RecurError::Config(
                    "retry.max_delay_ms must not be less than retry.initial_delay_ms".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub enabled: bool,
    pub failure_threshold: u64,
    pub timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout_ms: DEFAULT_BREAKER_TIMEOUT_MS,
        }
    }
}

impl CircuitBreakerSettings {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.failure_threshold == 0 {
            return Err(RecurError::Config(
                "circuit_breaker.failure_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Alert threshold for one error category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Category label, e.g. `network` or `circuit_breaker`
    pub category: String,
    pub count: u64,
    pub window_secs: u64,
}

/// Error reporter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterSettings {
    /// `text` or `json`
    pub format: String,
    pub metrics: bool,
    pub health: bool,
    pub trends: bool,
    pub trend_retention_secs: u64,
    pub max_trend_entries: usize,
    pub alerts: Vec<AlertSettings>,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            metrics: true,
            health: true,
            trends: true,
            trend_retention_secs: DEFAULT_TREND_RETENTION_SECS,
            max_trend_entries: DEFAULT_MAX_TREND_ENTRIES,
            alerts: Vec::new(),
        }
    }
}

impl ReporterSettings {
    fn validate(&self) -> Result<()> {
        if !matches!(self.format.to_ascii_lowercase().as_str(), "text" | "json") {
            return Err(RecurError::Config(format!(
                "reporter.format must be 'text' or 'json', got '{}'",
                self.format
            )));
        }
        if let Some(alert) = self.alerts.iter().find(|a| a.count == 0 || a.window_secs == 0) {
            return Err(RecurError::Config(format!(
                "reporter.alerts entry for '{}' needs a positive count and window_secs",
                alert.category
            )));
        }
        Ok(())
    }
}

/// Process-wide tracing setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}
