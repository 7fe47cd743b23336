//! # Recur Domain
//!
//! Domain types and configuration for Recur.
//!
//! This crate contains:
//! - Execution and evaluation result types
//! - Output pattern configuration
//! - Configuration structures and their validation
//! - Domain error types and Result definitions
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Recur crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
