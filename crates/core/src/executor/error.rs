//! Executor errors

use std::time::Duration;

use recur_common::{ErrorCategory, ErrorClassification, ErrorSeverity};
use thiserror::Error;

use crate::pattern::PatternError;

/// Why a command could not produce an [`recur_domain::ExecutionResult`]
///
/// A command that ran and exited non-zero is not an error; it is an `Ok`
/// result carrying that exit code.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid executor configuration: {0}")]
    InvalidConfig(String),

    #[error("command timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("command cancelled")]
    Cancelled,

    #[error("failed to start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running command: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl ExecutorError {
    /// True for the two interruption kinds, as opposed to launch or I/O failures
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }
}

impl ErrorClassification for ExecutorError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument(_) | Self::InvalidConfig(_) | Self::Pattern(_) => {
                ErrorCategory::Configuration
            }
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::System,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCategory::Permission
            }
            Self::Spawn { .. } => ErrorCategory::Command,
            Self::Io(_) => ErrorCategory::System,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidArgument(_) | Self::InvalidConfig(_) | Self::Pattern(_) => {
                ErrorSeverity::High
            }
            Self::Spawn { .. } => ErrorSeverity::High,
            Self::Cancelled => ErrorSeverity::Low,
            Self::Timeout { .. } | Self::Io(_) => ErrorSeverity::Medium,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
