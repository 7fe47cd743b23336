//! Shared infrastructure for the Recur crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification, collections, serde helpers
//! - `runtime`: async infrastructure (resilience patterns, error reporting)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod collections;
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod observability;
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{BoxedError, ErrorCategory, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use observability::{
    CategorizedError, ErrorAlert, ErrorMetrics, ErrorReporter, ErrorTrend, HealthStatus,
    LogFormat, ReporterConfig,
};
#[cfg(feature = "runtime")]
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStatistics, CircuitState, Clock,
    ConditionalPolicy, ExponentialBackoffPolicy, FixedDelayPolicy, LinearBackoffPolicy,
    MockClock, RecoveryManager, RecoveryStatistics, ResilienceError, RetryPolicy, SystemClock,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
