//! Output pattern evaluation
//!
//! Decides whether a finished run succeeded by looking at its output before
//! falling back to the exit code.

pub mod matcher;

pub use matcher::{PatternError, PatternMatcher};
