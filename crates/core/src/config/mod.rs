//! Configuration loading and component wiring
//!
//! [`loader`] produces a validated [`recur_domain::Config`]; the functions
//! here turn its sections into the resilience and reporting components from
//! `recur-common`.

pub mod loader;

use std::sync::Arc;
use std::time::Duration;

use recur_common::observability::{classify_as, ErrorReporter, LogFormat, ReporterConfig};
use recur_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, ExponentialBackoffPolicy, FixedDelayPolicy,
    LinearBackoffPolicy, RecoveryManager, RetryPolicy,
};
use recur_common::ErrorCategory;
use recur_domain::{
    CircuitBreakerSettings, RecurError, ReporterSettings, Result, RetrySettings, RetryStrategy,
};

use crate::executor::ExecutorError;
use crate::pattern::PatternError;

pub use loader::{
    apply_env_overrides, apply_env_overrides_from, load, load_from_file, probe_config_paths,
};

/// Retry policy for the configured strategy; `None` for `none`
pub fn build_retry_policy(settings: &RetrySettings) -> Option<Arc<dyn RetryPolicy>> {
    let initial = Duration::from_millis(settings.initial_delay_ms);
    match settings.strategy {
        RetryStrategy::Exponential => Some(Arc::new(ExponentialBackoffPolicy::new(
            settings.max_retries,
            initial,
            settings.multiplier,
            Duration::from_millis(settings.max_delay_ms),
        ))),
        RetryStrategy::Linear => Some(Arc::new(LinearBackoffPolicy::new(
            settings.max_retries,
            initial,
            Duration::from_millis(settings.increment_ms),
        ))),
        RetryStrategy::Fixed => {
            Some(Arc::new(FixedDelayPolicy::new(settings.max_retries, initial)))
        }
        RetryStrategy::None => None,
    }
}

/// Recovery manager running the configured retry policy with state tracking
pub fn build_recovery_manager(
    settings: &RetrySettings,
    reporter: Option<Arc<ErrorReporter>>,
) -> RecoveryManager {
    let mut manager = RecoveryManager::new().with_state_tracking();
    if let Some(policy) = build_retry_policy(settings) {
        manager = manager.with_shared_policy(policy);
    }
    if let Some(reporter) = reporter {
        manager = manager.with_reporter(reporter);
    }
    manager
}

pub fn circuit_breaker_config(settings: &CircuitBreakerSettings) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: settings.failure_threshold,
        timeout: Duration::from_millis(settings.timeout_ms),
    }
}

/// Circuit breaker named `name`, or `None` when disabled
///
/// # Errors
/// Returns `RecurError::Config` if the threshold is zero.
pub fn build_circuit_breaker(
    name: &str,
    settings: &CircuitBreakerSettings,
    reporter: Option<Arc<ErrorReporter>>,
) -> Result<Option<CircuitBreaker>> {
    if !settings.enabled {
        return Ok(None);
    }
    let breaker = CircuitBreaker::new(name, circuit_breaker_config(settings))
        .map_err(|e| RecurError::Config(format!("circuit_breaker: {e}")))?;
    Ok(Some(match reporter {
        Some(reporter) => breaker.with_reporter(reporter),
        None => breaker,
    }))
}

/// # Errors
/// Returns `RecurError::Config` for an unknown format.
pub fn reporter_config(settings: &ReporterSettings) -> Result<ReporterConfig> {
    let format = settings
        .format
        .parse::<LogFormat>()
        .map_err(|e| RecurError::Config(format!("reporter.format: {e}")))?;

    Ok(ReporterConfig {
        format,
        enable_metrics: settings.metrics,
        enable_health: settings.health,
        enable_trends: settings.trends,
        trend_retention: Duration::from_secs(settings.trend_retention_secs),
        max_trend_entries: settings.max_trend_entries,
    })
}

/// Reporter writing to stderr with the configured alert thresholds installed
///
/// Executor and pattern errors are classified by variant rather than by
/// message keywords.
///
/// # Errors
/// Returns `RecurError::Config` for an unknown format or alert category.
pub fn build_reporter(settings: &ReporterSettings) -> Result<ErrorReporter> {
    let reporter = ErrorReporter::new(reporter_config(settings)?)
        .with_classifier(classify_as::<ExecutorError>())
        .with_classifier(classify_as::<PatternError>());
    for alert in &settings.alerts {
        let category = alert
            .category
            .parse::<ErrorCategory>()
            .map_err(|e| RecurError::Config(format!("reporter.alerts: {e}")))?;
        reporter.set_alert_threshold(category, alert.count, Duration::from_secs(alert.window_secs));
    }
    Ok(reporter)
}
