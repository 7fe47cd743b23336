//! Aggregate counters and health derived from reported errors

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ErrorCategory, ErrorSeverity};

/// Running totals across all reported errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorMetrics {
    pub total_errors: u64,
    pub errors_by_category: BTreeMap<ErrorCategory, u64>,
    pub errors_by_severity: BTreeMap<ErrorSeverity, u64>,
    pub last_report_time: Option<DateTime<Utc>>,
}

impl ErrorMetrics {
    pub(crate) fn record(
        &mut self,
        category: ErrorCategory,
        severity: ErrorSeverity,
        at: DateTime<Utc>,
    ) {
        self.total_errors += 1;
        *self.errors_by_category.entry(category).or_default() += 1;
        *self.errors_by_severity.entry(severity).or_default() += 1;
        self.last_report_time = Some(at);
    }

    /// Count for one category (zero if never seen)
    pub fn category_count(&self, category: ErrorCategory) -> u64 {
        self.errors_by_category.get(&category).copied().unwrap_or(0)
    }

    /// Count for one severity (zero if never seen)
    pub fn severity_count(&self, severity: ErrorSeverity) -> u64 {
        self.errors_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Most distinct issues a [`HealthStatus`] remembers
pub const MAX_HEALTH_ISSUES: usize = 32;

/// Health derived from reported errors
///
/// Health only ever degrades: once a critical error has been reported the
/// status stays unhealthy for the lifetime of the reporter. `issues` holds
/// distinct issues only, newest last, and drops the oldest past
/// [`MAX_HEALTH_ISSUES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub(crate) fn healthy_at(timestamp: DateTime<Utc>) -> Self {
        Self { healthy: true, issues: Vec::new(), timestamp }
    }

    pub(crate) fn degrade(&mut self, issue: String, at: DateTime<Utc>) {
        self.healthy = false;
        self.timestamp = at;
        if let Some(seen) = self.issues.iter().position(|known| *known == issue) {
            let repeated = self.issues.remove(seen);
            self.issues.push(repeated);
            return;
        }
        if self.issues.len() == MAX_HEALTH_ISSUES {
            self.issues.remove(0);
        }
        self.issues.push(issue);
    }
}
