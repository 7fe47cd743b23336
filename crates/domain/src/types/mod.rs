//! Domain types
//!
//! - **[`execution`]**: results of running and evaluating a command
//! - **[`pattern`]**: output patterns that override exit codes

pub mod execution;
pub mod pattern;

pub use execution::{EvaluationReason, EvaluationResult, ExecutionResult};
pub use pattern::PatternConfig;
