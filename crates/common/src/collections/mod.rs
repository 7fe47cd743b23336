//! Specialized data structures
//!
//! - **[`ring_buffer`]**: fixed-size FIFO history with eviction

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
