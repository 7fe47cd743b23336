//! Resilience patterns for unreliable operations
//!
//! This module provides generic, reusable building blocks:
//! - **Retry policies**: exponential, linear, fixed and predicate-driven
//! - **Circuit breaker**: stops calling a target that keeps failing
//! - **Recovery manager**: retry loop with cancellation, fallback and
//!   optional state tracking
//!
//! Everything here is generic over the operation's error type, which is
//! erased into [`BoxedError`](crate::error::BoxedError) at the boundary.
//! Time-dependent behaviour goes through the [`Clock`] trait so tests can use
//! [`MockClock`].
//!
//! ## Composition
//!
//! The circuit breaker and recovery manager compose by nesting: pass a
//! closure that calls [`CircuitBreaker::execute`] to
//! [`RecoveryManager::execute_with_retry`]. An open-circuit rejection then
//! reaches the retry policy as a [`ResilienceError`] source, which a
//! [`ConditionalPolicy`] can decline to retry.

pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod recovery;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerStatistics,
    CircuitState,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
pub use recovery::{
    FallbackFn, RecoveryFailure, RecoveryManager, RecoveryStatistics, RECENT_FAILURE_CAPACITY,
};
pub use retry::{
    predicates, ConditionalPolicy, ErrorPredicate, ExponentialBackoffPolicy, FixedDelayPolicy,
    LinearBackoffPolicy, RetryPolicy,
};
