//! Success/failure pattern matcher
//!
//! Precedence, highest first:
//!
//! 1. failure pattern matches anywhere in the output: failed, exit code `1`
//! 2. success pattern matches: succeeded, exit code `0`
//! 3. otherwise the process exit code decides (success iff `0`)
//!
//! Absent or empty patterns skip their step.

use recur_common::{ErrorCategory, ErrorClassification, ErrorSeverity};
use recur_domain::{EvaluationReason, EvaluationResult, PatternConfig};
use regex::Regex;
use thiserror::Error;

/// Which of the two patterns failed to compile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Success,
    Failure,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure => f.write_str("failure"),
        }
    }
}

/// Errors building a [`PatternMatcher`]
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid {which} pattern '{pattern}': {source}")]
    InvalidPattern {
        which: PatternKind,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ErrorClassification for PatternError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::High
    }

    fn is_retryable(&self) -> bool {
        false
    }
}

/// Compiled success/failure patterns
///
/// Evaluation is pure, so one matcher can be shared across tasks.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    success: Option<Regex>,
    failure: Option<Regex>,
}

impl PatternMatcher {
    /// Compile the configured patterns.
    ///
    /// # Errors
    /// Returns [`PatternError::InvalidPattern`] if either pattern is not a
    /// valid regular expression.
    pub fn new(config: &PatternConfig) -> Result<Self, PatternError> {
        let ci = config.case_insensitive;
        Ok(Self {
            success: compile(PatternKind::Success, config.success_pattern(), ci)?,
            failure: compile(PatternKind::Failure, config.failure_pattern(), ci)?,
        })
    }

    /// Whether any pattern is configured
    pub fn has_patterns(&self) -> bool {
        self.success.is_some() || self.failure.is_some()
    }

    /// Judge a finished run from its combined output and exit code
    pub fn evaluate_result(&self, output: &str, exit_code: i32) -> EvaluationResult {
        if self.failure.as_ref().is_some_and(|re| re.is_match(output)) {
            return EvaluationResult {
                success: false,
                exit_code: 1,
                reason: EvaluationReason::FailurePatternMatched,
            };
        }

        if self.success.as_ref().is_some_and(|re| re.is_match(output)) {
            return EvaluationResult {
                success: true,
                exit_code: 0,
                reason: EvaluationReason::SuccessPatternMatched,
            };
        }

        EvaluationResult::from_exit_code(exit_code)
    }
}

fn compile(
    which: PatternKind,
    pattern: Option<&str>,
    case_insensitive: bool,
) -> Result<Option<Regex>, PatternError> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };
    let expr = if case_insensitive { format!("(?i){pattern}") } else { pattern.to_string() };
    Regex::new(&expr).map(Some).map_err(|source| PatternError::InvalidPattern {
        which,
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(config: PatternConfig) -> PatternMatcher {
        PatternMatcher::new(&config).expect("valid patterns")
    }

    #[test]
    fn test_failure_pattern_wins_over_success_and_exit_code() {
        let m = matcher(PatternConfig::success("OK").with_failure("ERROR"));

        let result = m.evaluate_result("OK ... ERROR", 0);
        assert_eq!(
            result,
            EvaluationResult {
                success: false,
                exit_code: 1,
                reason: EvaluationReason::FailurePatternMatched
            }
        );
    }

    #[test]
    fn test_success_pattern_overrides_nonzero_exit() {
        let m = matcher(PatternConfig::success(r"deployed \d+ services"));

        let result = m.evaluate_result("deployed 3 services\n", 2);
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.reason, EvaluationReason::SuccessPatternMatched);
    }

    #[test]
    fn test_no_match_uses_exit_code() {
        let m = matcher(PatternConfig::success("OK").with_failure("ERROR"));

        assert_eq!(m.evaluate_result("nothing here", 0), EvaluationResult::from_exit_code(0));
        assert_eq!(m.evaluate_result("nothing here", 42), EvaluationResult::from_exit_code(42));
    }

    #[test]
    fn test_no_patterns_uses_exit_code() {
        let m = matcher(PatternConfig::default());
        assert!(!m.has_patterns());
        assert_eq!(m.evaluate_result("ERROR", 3).exit_code, 3);
    }

    #[test]
    fn test_empty_pattern_is_ignored() {
        let m = matcher(PatternConfig::success("").with_failure("fatal"));
        assert!(m.has_patterns());
        assert_eq!(m.evaluate_result("", 5).reason, EvaluationReason::ExitCodeUsed);
    }

    #[test]
    fn test_case_insensitive() {
        let sensitive = matcher(PatternConfig::failure("error"));
        assert!(sensitive.evaluate_result("ERROR", 0).success);

        let insensitive = matcher(PatternConfig::failure("error").case_insensitive(true));
        assert!(!insensitive.evaluate_result("ERROR", 0).success);
    }

    #[test]
    fn test_invalid_pattern_names_which() {
        let err = PatternMatcher::new(&PatternConfig::success("ok").with_failure("(unclosed"))
            .expect_err("invalid regex");

        let PatternError::InvalidPattern { which, pattern, .. } = &err;
        assert_eq!(*which, PatternKind::Failure);
        assert_eq!(pattern, "(unclosed");
        assert!(err.to_string().starts_with("invalid failure pattern '(unclosed'"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let config = PatternConfig::success("ready").with_failure("panic").case_insensitive(true);
        let a = matcher(config.clone());
        let b = matcher(config);

        for (output, exit_code) in
            [("service READY", 1), ("thread panicked", 0), ("ready after panic", 0), ("", 3)]
        {
            assert_eq!(a.evaluate_result(output, exit_code), b.evaluate_result(output, exit_code));
            assert_eq!(a.evaluate_result(output, exit_code), a.evaluate_result(output, exit_code));
        }
    }
}
