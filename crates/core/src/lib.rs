//! # Recur Core
//!
//! Command execution and outcome evaluation.
//!
//! This crate contains:
//! - [`pattern`]: success/failure pattern matching over command output
//! - [`executor`]: runs one command under a timeout with optional streaming
//! - [`config`]: configuration loading and wiring into `recur-common`
//!   resilience and reporting components
//! - [`logging`]: tracing subscriber setup
//!
//! ## Architecture Principles
//! - Depends on `recur-domain` for data types and `recur-common` for
//!   resilience and error reporting
//! - Never retries on its own; retries are layered on top with a
//!   `RecoveryManager`

pub mod config;
pub mod executor;
pub mod logging;
pub mod pattern;

pub use executor::{Executor, ExecutorError, OutputSink, OutputStream, StdioSink};
pub use pattern::{PatternError, PatternMatcher};
