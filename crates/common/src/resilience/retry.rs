//! Retry policies
//!
//! A [`RetryPolicy`] answers three questions for the
//! [`RecoveryManager`](super::RecoveryManager): may another retry be made,
//! how long to wait before it, and is this particular error worth retrying.
//! Policies are stateless beyond their configuration.
//!
//! Attempt numbering starts at `1` for the first *retry*; the initial call is
//! not counted. `should_retry(attempt)` is `attempt <= max_retries`, so an
//! operation is invoked at most `max_retries + 1` times.
//!
//! | Policy | Delay for retry `n` | Retries which errors |
//! |--------|---------------------|----------------------|
//! | [`ExponentialBackoffPolicy`] | `initial * multiplier^(n-1)`, capped | all |
//! | [`LinearBackoffPolicy`] | `initial + (n-1) * increment` | all |
//! | [`FixedDelayPolicy`] | constant | all |
//! | [`ConditionalPolicy`] | constant | those matching a predicate |

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether and when a failed operation is retried
pub trait RetryPolicy: Send + Sync {
    /// Whether retry number `attempt` (1-based) is allowed.
    fn should_retry(&self, attempt: u32) -> bool;

    /// Delay before retry number `attempt` (1-based).
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Whether `error` is worth retrying at all.
    fn should_retry_error(&self, error: &(dyn StdError + Send + Sync + 'static)) -> bool;
}

impl<P: RetryPolicy + ?Sized> RetryPolicy for Arc<P> {
    fn should_retry(&self, attempt: u32) -> bool {
        (**self).should_retry(attempt)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        (**self).next_delay(attempt)
    }

    fn should_retry_error(&self, error: &(dyn StdError + Send + Sync + 'static)) -> bool {
        (**self).should_retry_error(error)
    }
}

/// Exponential backoff: `initial_delay * multiplier^(attempt-1)`, capped at
/// `max_delay`
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoffPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl ExponentialBackoffPolicy {
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self { max_retries, initial_delay, multiplier, max_delay }
    }
}

impl Default for ExponentialBackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), 2.0, Duration::from_secs(30))
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let cap = self.max_delay.as_nanos() as f64;
        let delay = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);

        // NaN and overflow both land on the cap
        if delay.is_nan() || delay >= cap {
            return self.max_delay;
        }
        Duration::from_nanos(delay.max(0.0) as u64)
    }

    fn should_retry_error(&self, _error: &(dyn StdError + Send + Sync + 'static)) -> bool {
        true
    }
}

/// Linear backoff: `initial_delay + (attempt-1) * increment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearBackoffPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub increment: Duration,
}

impl LinearBackoffPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, increment: Duration) -> Self {
        Self { max_retries, initial_delay, increment }
    }
}

impl RetryPolicy for LinearBackoffPolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_add(self.increment.saturating_mul(attempt.saturating_sub(1)))
    }

    fn should_retry_error(&self, _error: &(dyn StdError + Send + Sync + 'static)) -> bool {
        true
    }
}

/// Constant delay between retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelayPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl FixedDelayPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl RetryPolicy for FixedDelayPolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn should_retry_error(&self, _error: &(dyn StdError + Send + Sync + 'static)) -> bool {
        true
    }
}

/// Predicate over an operation error
pub type ErrorPredicate =
    Arc<dyn Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync>;

/// Fixed-delay policy that only retries errors matching one of its predicates
///
/// Predicates are consulted in insertion order; an empty list never retries.
///
/// ```rust
/// use std::time::Duration;
///
/// use recur_common::resilience::{predicates, ConditionalPolicy, RetryPolicy};
///
/// let policy = ConditionalPolicy::new(3, Duration::from_millis(50))
///     .retry_on(predicates::message_contains("connection refused"));
///
/// let err: recur_common::BoxedError = "dial tcp: connection refused".into();
/// assert!(policy.should_retry_error(err.as_ref()));
/// ```
#[derive(Clone)]
pub struct ConditionalPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    predicates: Vec<ErrorPredicate>,
}

impl ConditionalPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay, predicates: Vec::new() }
    }

    /// Add a predicate; the error is retried if any predicate matches.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Retry errors whose message contains `needle`.
    pub fn retry_on_message(self, needle: impl Into<String>) -> Self {
        self.retry_on(predicates::message_contains(needle))
    }

    /// Add an already shared predicate.
    pub fn retry_on_shared(mut self, predicate: ErrorPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Number of configured predicates.
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }
}

impl fmt::Debug for ConditionalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalPolicy")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl RetryPolicy for ConditionalPolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn should_retry_error(&self, error: &(dyn StdError + Send + Sync + 'static)) -> bool {
        self.predicates.iter().any(|predicate| predicate(error))
    }
}

/// Ready-made predicates for [`ConditionalPolicy`]
pub mod predicates {
    use std::error::Error as StdError;

    use crate::error::ErrorClassification;

    /// Matches when the error's display text contains `needle`.
    pub fn message_contains(
        needle: impl Into<String>,
    ) -> impl Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync + 'static {
        let needle = needle.into();
        move |error: &(dyn StdError + Send + Sync + 'static)| error.to_string().contains(&needle)
    }

    /// Matches when the error chain contains an `E` that reports itself as
    /// retryable.
    pub fn retryable_errors<E>(
    ) -> impl Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync + 'static
    where
        E: ErrorClassification + StdError + 'static,
    {
        error_is::<E, _>(|error: &E| error.is_retryable())
    }

    /// Matches when the error, or any error in its source chain, is an `E`
    /// satisfying `check`.
    pub fn error_is<E, F>(
        check: F,
    ) -> impl Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync + 'static
    where
        E: StdError + 'static,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        move |error: &(dyn StdError + Send + Sync + 'static)| {
            let first: &(dyn StdError + 'static) = error;
            let mut current = Some(first);
            while let Some(err) = current {
                if let Some(typed) = err.downcast_ref::<E>() {
                    if check(typed) {
                        return true;
                    }
                }
                current = err.source();
            }
            false
        }
    }
}
