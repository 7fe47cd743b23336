//! Error reporter: categorization, log lines, metrics, health, trends and alerts
//!
//! [`ErrorReporter`] is the sink every failure flows into. For each reported
//! error it:
//!
//! 1. categorizes it (unless it already is a [`CategorizedError`])
//! 2. writes one log line to its sink and emits a `tracing` event
//! 3. updates metrics and health when enabled
//! 4. evaluates the category's alert threshold, counting the new error
//! 5. appends it to the trend history
//!
//! Reporting is best-effort: sink write failures are ignored and nothing here
//! returns an error to the caller.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use recur_common::observability::{ErrorReporter, MemorySink, ReporterConfig};
//! use recur_common::ErrorCategory;
//!
//! let sink = MemorySink::default();
//! let reporter = ErrorReporter::new(ReporterConfig::default()).with_sink(sink.clone());
//! reporter.set_alert_threshold(ErrorCategory::Network, 2, Duration::from_secs(60));
//!
//! assert!(reporter.report_error("connection refused").is_none());
//! let alert = reporter.report_error("connection refused").expect("threshold reached");
//! assert_eq!(alert.count, 2);
//! assert!(sink.contents().contains("category=network"));
//! ```

mod categorized;
mod metrics;
mod trend;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub use categorized::CategorizedError;
pub use metrics::{ErrorMetrics, HealthStatus, MAX_HEALTH_ISSUES};
pub use trend::{AlertThreshold, ErrorAlert, ErrorTrend};
use trend::TrendHistory;

use crate::error::{BoxedError, ErrorCategory, ErrorClassification, ErrorSeverity};
use crate::resilience::{CircuitState, Clock, ResilienceError, SystemClock};

/// Output format of the reporter's log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

/// Reporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub format: LogFormat,
    pub enable_metrics: bool,
    pub enable_health: bool,
    pub enable_trends: bool,
    /// How long reported errors are kept for trends
    ///
    /// History is kept at least as long as the widest alert window.
    #[serde(with = "crate::utils::serde::duration_secs")]
    pub trend_retention: Duration,
    /// Upper bound on retained history entries per category
    ///
    /// Raised to the largest alert threshold count when that is higher.
    pub max_trend_entries: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            enable_metrics: true,
            enable_health: true,
            enable_trends: true,
            trend_retention: Duration::from_secs(24 * 60 * 60),
            max_trend_entries: 10_000,
        }
    }
}

/// Maps an error to a category and severity, or `None` to defer
pub type Classifier =
    Arc<dyn Fn(&(dyn StdError + 'static)) -> Option<(ErrorCategory, ErrorSeverity)> + Send + Sync>;

/// Classifier for any error type implementing [`ErrorClassification`].
pub fn classify_as<E>() -> Classifier
where
    E: ErrorClassification + StdError + 'static,
{
    Arc::new(|error: &(dyn StdError + 'static)| {
        error.downcast_ref::<E>().map(|e| (e.category(), e.severity()))
    })
}

fn builtin_classifiers() -> Vec<Classifier> {
    // Operation errors defer to their source
    let resilience: Classifier = Arc::new(|error: &(dyn StdError + 'static)| {
        match error.downcast_ref::<ResilienceError>()? {
            ResilienceError::Operation(_) => None,
            other => Some((other.category(), other.severity())),
        }
    });
    vec![classify_as::<CategorizedError>(), resilience]
}

/// Keyword classification for errors no classifier recognized
fn classify_message(message: &str) -> (ErrorCategory, ErrorSeverity) {
    let message = message.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));

    if has(&["timeout", "timed out", "deadline"]) {
        (ErrorCategory::Timeout, ErrorSeverity::Medium)
    } else if has(&["connection", "network", "dns", "refused", "unreachable"]) {
        (ErrorCategory::Network, ErrorSeverity::Medium)
    } else if has(&["permission", "access denied", "forbidden"]) {
        (ErrorCategory::Permission, ErrorSeverity::High)
    } else if has(&["not found", "exit", "command"]) {
        (ErrorCategory::Command, ErrorSeverity::Medium)
    } else if has(&["config"]) {
        (ErrorCategory::Configuration, ErrorSeverity::High)
    } else {
        (ErrorCategory::System, ErrorSeverity::Medium)
    }
}

/// In-memory sink, mainly for tests
#[derive(Debug, Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    timestamp: String,
    message: &'a str,
    category: ErrorCategory,
    severity: ErrorSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a std::collections::BTreeMap<String, String>>,
}

#[derive(Serialize)]
struct StateChangeRecord<'a> {
    timestamp: String,
    event: &'static str,
    service: &'a str,
    old_state: CircuitState,
    new_state: CircuitState,
}

#[derive(Serialize)]
struct RecoveryRecord {
    timestamp: String,
    event: &'static str,
    attempt: u32,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

struct ReporterState {
    metrics: ErrorMetrics,
    health: HealthStatus,
    history: TrendHistory,
    thresholds: HashMap<ErrorCategory, AlertThreshold>,
}

impl ReporterState {
    /// Retention and per-category cap that still cover every alert threshold
    fn history_bounds(&self, config: &ReporterConfig) -> (Duration, usize) {
        self.thresholds.values().fold(
            (config.trend_retention, config.max_trend_entries),
            |(retention, cap), threshold| {
                let count = usize::try_from(threshold.count).unwrap_or(usize::MAX);
                (retention.max(threshold.window), cap.max(count))
            },
        )
    }
}

/// Sink for categorized errors with metrics, health, trends and alerts
pub struct ErrorReporter {
    config: ReporterConfig,
    sink: Mutex<Box<dyn Write + Send>>,
    clock: Arc<dyn Clock>,
    classifiers: Vec<Classifier>,
    state: RwLock<ReporterState>,
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("config", &self.config)
            .field("classifiers", &self.classifiers.len())
            .finish_non_exhaustive()
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(ReporterConfig::default())
    }
}

impl ErrorReporter {
    /// Reporter writing to stderr using the system clock
    pub fn new(config: ReporterConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let now = clock.utc_now();
        Self {
            config,
            sink: Mutex::new(Box::new(io::stderr())),
            clock,
            classifiers: builtin_classifiers(),
            state: RwLock::new(ReporterState {
                metrics: ErrorMetrics::default(),
                health: HealthStatus::healthy_at(now),
                history: TrendHistory::default(),
                thresholds: HashMap::new(),
            }),
        }
    }

    /// Write log lines to `sink` instead of stderr.
    pub fn with_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sink = Mutex::new(Box::new(sink));
        self
    }

    /// Read time from `clock` (useful for testing).
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self.state.get_mut().health.timestamp = self.clock.utc_now();
        self
    }

    /// Add a classifier, consulted after previously added ones.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifiers.push(classifier);
        self
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Raise an alert once `count` errors of `category` fall within `window`.
    pub fn set_alert_threshold(&self, category: ErrorCategory, count: u64, window: Duration) {
        self.state.write().thresholds.insert(category, AlertThreshold { count, window });
    }

    pub fn clear_alert_threshold(&self, category: ErrorCategory) {
        self.state.write().thresholds.remove(&category);
    }

    pub fn alert_threshold(&self, category: ErrorCategory) -> Option<AlertThreshold> {
        self.state.read().thresholds.get(&category).copied()
    }

    /// Build a [`CategorizedError`] for `error` without reporting it.
    ///
    /// Classifiers are tried against the error and then down its source
    /// chain; if none match, the message is classified by keyword.
    pub fn categorize(&self, error: BoxedError) -> CategorizedError {
        let (category, severity) = self.classify(error.as_ref());
        CategorizedError::new(error.to_string(), category, severity)
            .with_timestamp(self.clock.utc_now())
            .with_source(error)
    }

    fn classify(&self, error: &(dyn StdError + 'static)) -> (ErrorCategory, ErrorSeverity) {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(found) = self.classifiers.iter().find_map(|classify| classify(err)) {
                return found;
            }
            current = err.source();
        }
        classify_message(&error.to_string())
    }

    /// Report any error, returning an alert if its category crossed its threshold.
    pub fn report_error(&self, error: impl Into<BoxedError>) -> Option<ErrorAlert> {
        match error.into().downcast::<CategorizedError>() {
            Ok(categorized) => self.report(*categorized),
            Err(other) => {
                let categorized = self.categorize(other);
                self.report(categorized)
            }
        }
    }

    /// Report an already categorized error.
    pub fn report(&self, error: CategorizedError) -> Option<ErrorAlert> {
        self.write_line(&self.format_error(&error));
        emit_event(&error);

        let now = self.clock.utc_now();
        let mut state = self.state.write();

        if self.config.enable_metrics {
            state.metrics.record(error.category, error.severity, error.timestamp);
        }

        if self.config.enable_health && error.severity == ErrorSeverity::Critical {
            let issue = format!("critical {} error: {}", error.category, error.message);
            state.health.degrade(issue, now);
        }

        let alert = state.thresholds.get(&error.category).copied().and_then(|threshold| {
            let count = state.history.count_in_window(error.category, now, threshold.window) + 1;
            (count >= threshold.count).then(|| ErrorAlert {
                category: error.category,
                count,
                threshold: threshold.count,
                time_span: threshold.window,
                timestamp: now,
            })
        });

        if self.config.enable_trends || !state.thresholds.is_empty() {
            state.history.push(error.category, error.timestamp);
            let (retention, cap) = state.history_bounds(&self.config);
            state.history.prune(now, retention, cap);
        }
        drop(state);

        if let Some(alert) = &alert {
            warn!(
                category = %alert.category,
                count = alert.count,
                threshold = alert.threshold,
                window_secs = alert.time_span.as_secs(),
                "error alert threshold reached"
            );
        }
        alert
    }

    /// Per-category trends over `window`, or `None` when trends are disabled.
    pub fn get_trends(&self, window: Duration) -> Option<Vec<ErrorTrend>> {
        if !self.config.enable_trends {
            return None;
        }
        let now = self.clock.utc_now();
        Some(self.state.read().history.compute_trends(now, window))
    }

    /// Copy of the running totals, or `None` when metrics are disabled.
    pub fn get_metrics(&self) -> Option<ErrorMetrics> {
        self.config.enable_metrics.then(|| self.state.read().metrics.clone())
    }

    /// Copy of the health status, or `None` when health tracking is disabled.
    pub fn get_health_status(&self) -> Option<HealthStatus> {
        self.config.enable_health.then(|| self.state.read().health.clone())
    }

    /// Log a circuit breaker transition.
    pub fn log_circuit_breaker_state_change(
        &self,
        service: &str,
        old_state: CircuitState,
        new_state: CircuitState,
    ) {
        let timestamp = self.timestamp();
        let line = match self.config.format {
            LogFormat::Text => format!(
                "[{timestamp}] circuit_breaker_state_change service={service} \
                 old_state={old_state} new_state={new_state}"
            ),
            LogFormat::Json => to_json(&StateChangeRecord {
                timestamp,
                event: "circuit_breaker_state_change",
                service,
                old_state,
                new_state,
            }),
        };
        self.write_line(&line);
        info!(service, %old_state, %new_state, "circuit breaker state change");
    }

    /// Log one recovery attempt; `error` is `None` for a successful attempt.
    pub fn log_recovery_attempt(
        &self,
        attempt: u32,
        error: Option<&(dyn StdError + Send + Sync + 'static)>,
    ) {
        let timestamp = self.timestamp();
        let status = if error.is_some() { "failed" } else { "succeeded" };
        let message = error.map(ToString::to_string);

        let line = match self.config.format {
            LogFormat::Text => {
                let mut line =
                    format!("[{timestamp}] recovery_attempt attempt={attempt} status={status}");
                if let Some(message) = &message {
                    line.push_str(" error=");
                    line.push_str(message);
                }
                line
            }
            LogFormat::Json => to_json(&RecoveryRecord {
                timestamp,
                event: "recovery_attempt",
                attempt,
                status,
                error: message.clone(),
            }),
        };
        self.write_line(&line);
        debug!(attempt, status, error = message.as_deref(), "recovery attempt");
    }

    fn timestamp(&self) -> String {
        rfc3339(self.clock.utc_now())
    }

    fn format_error(&self, error: &CategorizedError) -> String {
        let timestamp = rfc3339(error.timestamp);
        match self.config.format {
            LogFormat::Text => {
                let mut line = format!(
                    "[{timestamp}] {} category={} severity={}",
                    error.message, error.category, error.severity
                );
                if !error.context.is_empty() {
                    line.push_str(&format!(" context={:?}", error.context));
                }
                line
            }
            LogFormat::Json => to_json(&ErrorRecord {
                timestamp,
                message: &error.message,
                category: error.category,
                severity: error.severity,
                context: (!error.context.is_empty()).then_some(&error.context),
            }),
        }
    }

    fn write_line(&self, line: &str) {
        let mut sink = self.sink.lock();
        // Best-effort
        let _ = writeln!(sink, "{line}");
        let _ = sink.flush();
    }
}

fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn to_json<T: Serialize>(record: &T) -> String {
    serde_json::to_string(record).unwrap_or_default()
}

fn emit_event(error: &CategorizedError) {
    let category = error.category.as_str();
    let severity = error.severity.as_str();
    match error.severity {
        ErrorSeverity::Critical | ErrorSeverity::High => {
            error!(category, severity, detail = %error.message, "error reported")
        }
        ErrorSeverity::Medium => {
            warn!(category, severity, detail = %error.message, "error reported")
        }
        ErrorSeverity::Low => debug!(category, severity, detail = %error.message, "error reported"),
    }
}
