//! Error types for resilience operations

use thiserror::Error;

use crate::error::{BoxedError, ErrorCategory, ErrorClassification, ErrorSeverity};

/// Configuration error raised when building a resilience component
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the circuit breaker and the recovery manager
///
/// The wrapped operation's own error is preserved unchanged in
/// [`ResilienceError::Operation`]; after retries are exhausted this is the
/// *last* error the operation returned, and after a fallback it is the
/// fallback's error.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The circuit breaker rejected the call without invoking the operation
    #[error("circuit breaker '{name}' is open, rejecting calls")]
    CircuitOpen { name: String },

    /// The caller's cancellation token fired before the operation completed
    #[error("operation cancelled")]
    Cancelled,

    /// The operation (or fallback) failed
    #[error("{0}")]
    Operation(#[source] BoxedError),
}

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

impl ResilienceError {
    /// Wrap an operation error.
    pub fn operation(error: impl Into<BoxedError>) -> Self {
        Self::Operation(error.into())
    }

    /// Whether this is the open-circuit rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The operation's own error, if this wraps one.
    pub fn operation_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Operation(source) => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Consume and return the operation's own error, if this wraps one.
    pub fn into_operation_error(self) -> Option<BoxedError> {
        match self {
            Self::Operation(source) => Some(source),
            _ => None,
        }
    }
}

impl ErrorClassification for ResilienceError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::CircuitOpen { .. } => ErrorCategory::CircuitBreaker,
            Self::Cancelled => ErrorCategory::System,
            Self::Operation(_) => ErrorCategory::Unknown,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. } => ErrorSeverity::Medium,
            Self::Cancelled => ErrorSeverity::Low,
            Self::Operation(_) => ErrorSeverity::Medium,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Operation(_))
    }
}
