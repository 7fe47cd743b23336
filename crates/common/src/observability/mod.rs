//! Observability primitives - error reporting, metrics, health and trends
//!
//! Process-wide logging is plain `tracing`; this module adds the
//! [`ErrorReporter`], which turns individual failures into categorized log
//! lines, running metrics, a health signal, trends and threshold alerts.

pub mod reporter;

pub use reporter::{
    classify_as, AlertThreshold, CategorizedError, Classifier, ErrorAlert, ErrorMetrics,
    ErrorReporter, ErrorTrend, HealthStatus, LogFormat, MemorySink, ReporterConfig,
    MAX_HEALTH_ISSUES,
};
