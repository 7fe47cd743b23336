//! Application constants
//!
//! Defaults shared by the configuration structs and the components that
//! consume them.

// Executor
pub const DEFAULT_EXECUTOR_TIMEOUT_MS: u64 = 30_000;

// Retry
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_LINEAR_INCREMENT_MS: u64 = 100;

// Circuit breaker
pub const DEFAULT_FAILURE_THRESHOLD: u64 = 5;
pub const DEFAULT_BREAKER_TIMEOUT_MS: u64 = 60_000;

// Error reporter
pub const DEFAULT_TREND_RETENTION_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_MAX_TREND_ENTRIES: usize = 10_000;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "RECUR_";
