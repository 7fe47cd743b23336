//! Error classification shared across the Recur crates
//!
//! Every error that can reach the error reporter is described along two
//! axes:
//!
//! 1. **`ErrorCategory`**: a stable label describing *where* the failure came
//!    from (network, timeout, command, permission, ...). Alert thresholds and
//!    trends are keyed by category.
//!
//! 2. **`ErrorSeverity`**: how serious the failure is. A `Critical` error
//!    permanently degrades the reporter's health status.
//!
//! Module-specific errors implement [`ErrorClassification`] so they can be
//! categorized without string matching:
//!
//! ```rust,ignore
//! impl ErrorClassification for ExecutorError {
//!     fn category(&self) -> ErrorCategory {
//!         match self {
//!             Self::Timeout { .. } => ErrorCategory::Timeout,
//!             Self::Spawn { .. } => ErrorCategory::Command,
//!             _ => ErrorCategory::System,
//!         }
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         ErrorSeverity::Medium
//!     }
//! }
//! ```
//!
//! ## Severity Levels
//!
//! | Level | Use Case |
//! |-------|----------|
//! | **Low** | Expected conditions, cancellations |
//! | **Medium** | Transient failures worth retrying (timeouts, network) |
//! | **High** | Failures requiring attention (permissions, system errors) |
//! | **Critical** | Integrity at risk; degrades health permanently |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type-erased error flowing through resilience wrappers and the reporter.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable category label attached to reported errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connectivity problems (refused connections, DNS, unreachable hosts)
    Network,
    /// Deadlines and timeouts
    Timeout,
    /// The executed command failed to launch or misbehaved
    Command,
    /// Permission or authorization failures
    Permission,
    /// Invalid or missing configuration
    Configuration,
    /// Rejections from an open circuit breaker
    CircuitBreaker,
    /// Operating system and runtime failures
    System,
    /// Anything that could not be classified
    Unknown,
}

impl ErrorCategory {
    /// All categories, in declaration order.
    pub const ALL: [ErrorCategory; 8] = [
        Self::Network,
        Self::Timeout,
        Self::Command,
        Self::Permission,
        Self::Configuration,
        Self::CircuitBreaker,
        Self::System,
        Self::Unknown,
    ];

    /// Label used in log lines and configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Command => "command",
            Self::Permission => "permission",
            Self::Configuration => "configuration",
            Self::CircuitBreaker => "circuit_breaker",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category or severity label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label: '{label}'")]
pub struct ParseLabelError {
    kind: &'static str,
    label: String,
}

impl FromStr for ErrorCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ParseLabelError { kind: "category", label: s.to_string() })
    }
}

/// Error severity levels for reporting and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Expected or benign
    Low,
    /// Transient, should be monitored
    Medium,
    /// Requires attention
    High,
    /// Immediate action required
    Critical,
}

impl ErrorSeverity {
    /// Label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorSeverity {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseLabelError { kind: "severity", label: s.to_string() }),
        }
    }
}

/// Standard interface for classifying errors by category and severity
///
/// Implemented by every error enum that the error reporter should be able to
/// categorize without falling back to message heuristics.
pub trait ErrorClassification {
    /// Category used for trends and alert thresholds.
    fn category(&self) -> ErrorCategory;

    /// Severity used for metrics and health.
    fn severity(&self) -> ErrorSeverity;

    /// Whether repeating the failed operation may succeed.
    ///
    /// Transient conditions (timeouts, network hiccups, non-zero exits of a
    /// flaky command) are retryable; construction and configuration errors
    /// are not.
    fn is_retryable(&self) -> bool {
        true
    }

    /// Whether this error requires immediate attention.
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error classification labels

    use super::*;

    struct Flaky;

    impl ErrorClassification for Flaky {
        fn category(&self) -> ErrorCategory {
            ErrorCategory::Network
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Critical
        }
    }

    #[test]
    fn test_category_labels_round_trip_through_from_str() {
        for category in ErrorCategory::ALL {
            let parsed: ErrorCategory = category.as_str().parse().expect("label should parse");
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_from_str_accepts_dashes_and_case() {
        assert_eq!("Circuit-Breaker".parse::<ErrorCategory>(), Ok(ErrorCategory::CircuitBreaker));
        assert_eq!(" NETWORK ".parse::<ErrorCategory>(), Ok(ErrorCategory::Network));
    }

    #[test]
    fn test_unknown_labels_are_rejected() {
        let err = "disk".parse::<ErrorCategory>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category label: 'disk'");
        assert!("severe".parse::<ErrorSeverity>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
        assert!(ErrorSeverity::High < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&ErrorSeverity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let json = serde_json::to_string(&ErrorCategory::CircuitBreaker).unwrap();
        assert_eq!(json, "\"circuit_breaker\"");
    }

    #[test]
    fn test_classification_defaults() {
        assert!(Flaky.is_retryable());
        assert!(Flaky.is_critical());
    }
}
