//! Results produced by running and evaluating a command

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

/// Why an execution was judged the way it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationReason {
    /// The failure pattern matched the output; takes precedence over everything
    #[serde(rename = "failure pattern matched")]
    FailurePatternMatched,
    /// The success pattern matched and the failure pattern did not
    #[serde(rename = "success pattern matched")]
    SuccessPatternMatched,
    /// No pattern decided, so the process exit code did
    #[serde(rename = "exit code used")]
    ExitCodeUsed,
}

impl_label_conversions!(EvaluationReason {
    FailurePatternMatched => "failure pattern matched",
    SuccessPatternMatched => "success pattern matched",
    ExitCodeUsed => "exit code used",
});

/// Verdict for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub success: bool,
    /// Exit code after evaluation: `1` when the failure pattern matched, `0`
    /// when the success pattern matched, otherwise the process exit code
    pub exit_code: i32,
    pub reason: EvaluationReason,
}

impl EvaluationResult {
    /// Verdict based only on the exit code
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self { success: exit_code == 0, exit_code, reason: EvaluationReason::ExitCodeUsed }
    }
}

/// Everything observed about one run of a command
///
/// `output` is stdout followed by stderr. `exit_code` and `success` are the
/// evaluated values, which may differ from what the process reported when a
/// pattern decided the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub output: String,
    pub duration: Duration,
    pub success: bool,
    pub reason: EvaluationReason,
}

impl ExecutionResult {
    /// Assemble a result from captured streams and an evaluation
    pub fn new(
        stdout: String,
        stderr: String,
        duration: Duration,
        evaluation: EvaluationResult,
    ) -> Self {
        let output = format!("{stdout}{stderr}");
        Self {
            exit_code: evaluation.exit_code,
            stdout,
            stderr,
            output,
            duration,
            success: evaluation.success,
            reason: evaluation.reason,
        }
    }

    /// The evaluation part of this result
    pub fn evaluation(&self) -> EvaluationResult {
        EvaluationResult { success: self.success, exit_code: self.exit_code, reason: self.reason }
    }
}
