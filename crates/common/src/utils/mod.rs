//! Common utility functions
//!
//! - **[`serde`]**: Serialization helpers for durations in reported snapshots

pub mod serde;

// Re-export commonly used items for convenience
pub use self::serde::{duration_millis, duration_secs};
