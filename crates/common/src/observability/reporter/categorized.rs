//! Errors tagged with a category and severity

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{BoxedError, ErrorCategory, ErrorClassification, ErrorSeverity};

/// An error enriched with a stable category and severity
///
/// The reporter builds one of these for every error it receives unless the
/// error already is one. Callers can build them directly to attach context.
///
/// ```rust
/// use recur_common::{CategorizedError, ErrorCategory, ErrorSeverity};
///
/// let err = CategorizedError::new("upstream refused", ErrorCategory::Network, ErrorSeverity::High)
///     .with_context("host", "db-1");
/// assert_eq!(err.context.get("host").map(String::as_str), Some("db-1"));
/// ```
#[derive(Debug)]
pub struct CategorizedError {
    pub message: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub context: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    source: Option<BoxedError>,
}

impl CategorizedError {
    pub fn new(
        message: impl Into<String>,
        category: ErrorCategory,
        severity: ErrorSeverity,
    ) -> Self {
        Self {
            message: message.into(),
            category,
            severity,
            context: BTreeMap::new(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    /// Add a context entry, replacing any previous value for `key`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attach the underlying error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for CategorizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CategorizedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorClassification for CategorizedError {
    fn category(&self) -> ErrorCategory {
        self.category
    }

    fn severity(&self) -> ErrorSeverity {
        self.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message_and_source_is_kept() {
        let err = CategorizedError::new("probe failed", ErrorCategory::Command, ErrorSeverity::Low)
            .with_source(std::io::Error::other("exit status 2"));

        assert_eq!(err.to_string(), "probe failed");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("exit status 2"));
    }

    #[test]
    fn test_context_overwrites_key() {
        let err = CategorizedError::new("x", ErrorCategory::System, ErrorSeverity::Medium)
            .with_context("attempt", 1)
            .with_context("attempt", 2);

        assert_eq!(err.context.len(), 1);
        assert_eq!(err.context["attempt"], "2");
    }

    #[test]
    fn test_critical_classification() {
        let err =
            CategorizedError::new("disk gone", ErrorCategory::System, ErrorSeverity::Critical);
        assert!(err.is_critical());
        assert_eq!(err.category(), ErrorCategory::System);
    }
}
