//! Retry and fallback orchestration
//!
//! [`RecoveryManager`] combines an optional [`RetryPolicy`] with an optional
//! fallback. Retry sleeps race the caller's [`CancellationToken`], so a
//! cancelled caller is never kept waiting for the next backoff interval.
//!
//! With state tracking enabled every invocation of the wrapped operation is
//! recorded: counters, a running average duration and the last ten failures.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::{ResilienceError, ResilienceResult};
use super::retry::RetryPolicy;
use crate::collections::RingBuffer;
use crate::error::BoxedError;
use crate::observability::ErrorReporter;

/// Number of failures kept in [`RecoveryStatistics::recent_failures`]
pub const RECENT_FAILURE_CAPACITY: usize = 10;

/// Erased fallback invoked with the caller's token and the original error
pub type FallbackFn = Arc<
    dyn Fn(CancellationToken, BoxedError) -> BoxFuture<'static, Result<(), BoxedError>>
        + Send
        + Sync,
>;

/// One failed invocation remembered by state tracking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryFailure {
    pub error: String,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of tracked recovery state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryStatistics {
    pub total_attempts: u64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    pub consecutive_successes: u64,
    pub consecutive_failures: u64,
    pub recent_failures: Vec<RecoveryFailure>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
    #[serde(with = "crate::utils::serde::duration_millis")]
    pub average_recovery_time: Duration,
}

#[derive(Debug)]
struct RecoveryState {
    total_attempts: u64,
    successful_recoveries: u64,
    failed_recoveries: u64,
    consecutive_successes: u64,
    consecutive_failures: u64,
    recent_failures: RingBuffer<RecoveryFailure>,
    last_success_time: Option<DateTime<Utc>>,
    last_failure_time: Option<DateTime<Utc>>,
    average_recovery_time: Option<Duration>,
}

impl Default for RecoveryState {
    fn default() -> Self {
        Self {
            total_attempts: 0,
            successful_recoveries: 0,
            failed_recoveries: 0,
            consecutive_successes: 0,
            consecutive_failures: 0,
            recent_failures: RingBuffer::new(RECENT_FAILURE_CAPACITY),
            last_success_time: None,
            last_failure_time: None,
            average_recovery_time: None,
        }
    }
}

impl RecoveryState {
    fn record(&mut self, elapsed: Duration, attempt: u32, error: Option<&BoxedError>) {
        let now = Utc::now();
        self.total_attempts += 1;
        self.average_recovery_time = Some(match self.average_recovery_time {
            Some(avg) => (avg + elapsed) / 2,
            None => elapsed,
        });

        match error {
            None => {
                self.successful_recoveries += 1;
                self.consecutive_successes += 1;
                self.consecutive_failures = 0;
                self.last_success_time = Some(now);
            }
            Some(error) => {
                self.failed_recoveries += 1;
                self.consecutive_failures += 1;
                self.consecutive_successes = 0;
                self.last_failure_time = Some(now);
                self.recent_failures.push(RecoveryFailure {
                    error: error.to_string(),
                    attempt,
                    timestamp: now,
                });
            }
        }
    }

    fn snapshot(&self) -> RecoveryStatistics {
        RecoveryStatistics {
            total_attempts: self.total_attempts,
            successful_recoveries: self.successful_recoveries,
            failed_recoveries: self.failed_recoveries,
            consecutive_successes: self.consecutive_successes,
            consecutive_failures: self.consecutive_failures,
            recent_failures: self.recent_failures.to_vec(),
            last_success_time: self.last_success_time,
            last_failure_time: self.last_failure_time,
            average_recovery_time: self.average_recovery_time.unwrap_or_default(),
        }
    }
}

/// Runs operations under a retry policy and/or a fallback
#[derive(Default)]
pub struct RecoveryManager {
    policy: Option<Arc<dyn RetryPolicy>>,
    fallback: Option<FallbackFn>,
    state: Option<RwLock<RecoveryState>>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl fmt::Debug for RecoveryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryManager")
            .field("has_policy", &self.policy.is_some())
            .field("has_fallback", &self.fallback.is_some())
            .field("tracks_state", &self.state.is_some())
            .finish()
    }
}

impl RecoveryManager {
    /// A manager with no policy and no fallback: operations run exactly once.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn with_shared_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Install a fallback run once after the operation (or its retries) failed.
    pub fn with_fallback<F, Fut, E>(mut self, fallback: F) -> Self
    where
        F: Fn(CancellationToken, BoxedError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxedError> + 'static,
    {
        self.fallback = Some(Arc::new(move |ctx: CancellationToken, error: BoxedError| {
            let fut = fallback(ctx, error);
            async move { fut.await.map_err(Into::<BoxedError>::into) }.boxed()
        }));
        self
    }

    /// Record every invocation in [`RecoveryStatistics`].
    pub fn with_state_tracking(mut self) -> Self {
        self.state = Some(RwLock::new(RecoveryState::default()));
        self
    }

    /// Log each invocation through `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn has_policy(&self) -> bool {
        self.policy.is_some()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Execute `operation`, retrying failures the policy accepts.
    ///
    /// Without a policy the operation runs exactly once. When retries are
    /// exhausted or the policy rejects the error, the last error is returned
    /// as [`ResilienceError::Operation`]. Cancellation of `ctx` is checked
    /// after each failure and during each backoff sleep.
    #[instrument(skip_all)]
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        ctx: &CancellationToken,
        mut operation: F,
    ) -> ResilienceResult<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxedError>,
    {
        let mut attempt: u32 = 0;

        loop {
            let error = match self.invoke(ctx, attempt, &mut operation).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if ctx.is_cancelled() {
                return Err(ResilienceError::Cancelled);
            }

            let Some(policy) = &self.policy else {
                return Err(ResilienceError::Operation(error));
            };

            attempt = attempt.saturating_add(1);
            if !policy.should_retry(attempt) || !policy.should_retry_error(error.as_ref()) {
                debug!(attempt, error = %error, "giving up on operation");
                return Err(ResilienceError::Operation(error));
            }

            let delay = policy.next_delay(attempt);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying operation"
            );

            tokio::select! {
                _ = ctx.cancelled() => return Err(ResilienceError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Execute `operation` once, handing its error to the fallback.
    ///
    /// The fallback's outcome replaces the operation's: its success turns the
    /// failure into `Ok(())`, its error replaces the original.
    #[instrument(skip_all)]
    pub async fn execute_with_fallback<F, Fut, E>(
        &self,
        ctx: &CancellationToken,
        mut operation: F,
    ) -> ResilienceResult<()>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<BoxedError>,
    {
        match self.invoke(ctx, 0, &mut operation).await {
            Ok(()) => Ok(()),
            Err(error) => self.fall_back(ctx, error).await,
        }
    }

    /// Exhaust retries, then fall back once.
    ///
    /// Cancellation is surfaced as [`ResilienceError::Cancelled`] without
    /// running the fallback.
    #[instrument(skip_all)]
    pub async fn execute_with_retry_and_fallback<F, Fut, E>(
        &self,
        ctx: &CancellationToken,
        operation: F,
    ) -> ResilienceResult<()>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<BoxedError>,
    {
        match self.execute_with_retry(ctx, operation).await {
            Ok(()) => Ok(()),
            Err(ResilienceError::Operation(error)) => self.fall_back(ctx, error).await,
            Err(other) => Err(other),
        }
    }

    /// Copy of the tracked state, or `None` when tracking is disabled.
    pub fn statistics(&self) -> Option<RecoveryStatistics> {
        self.state.as_ref().map(|state| state.read().snapshot())
    }

    /// Clear tracked state.
    pub fn reset_statistics(&self) {
        if let Some(state) = &self.state {
            *state.write() = RecoveryState::default();
        }
    }

    async fn fall_back(&self, ctx: &CancellationToken, error: BoxedError) -> ResilienceResult<()> {
        let Some(fallback) = &self.fallback else {
            return Err(ResilienceError::Operation(error));
        };

        warn!(error = %error, "operation failed, running fallback");
        fallback(ctx.clone(), error).await.map_err(ResilienceError::Operation)
    }

    async fn invoke<F, Fut, T, E>(
        &self,
        ctx: &CancellationToken,
        attempt: u32,
        operation: &mut F,
    ) -> Result<T, BoxedError>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxedError>,
    {
        let started = Instant::now();
        let result = operation(ctx.clone()).await.map_err(Into::into);
        let elapsed = started.elapsed();
        let error = result.as_ref().err();

        if let Some(state) = &self.state {
            state.write().record(elapsed, attempt, error);
        }
        if let Some(reporter) = &self.reporter {
            reporter.log_recovery_attempt(attempt + 1, error.map(|e| e.as_ref()));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::resilience::{ConditionalPolicy, FixedDelayPolicy};

    fn fast_policy(max_retries: u32) -> FixedDelayPolicy {
        FixedDelayPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_no_policy_runs_exactly_once() {
        let manager = RecoveryManager::new();
        let calls = &AtomicU32::new(0);
        let ctx = CancellationToken::new();

        let result: ResilienceResult<()> = manager
            .execute_with_retry(&ctx, move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fail")
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::Operation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let manager = RecoveryManager::new().with_policy(fast_policy(5));
        let calls = &AtomicU32::new(0);
        let ctx = CancellationToken::new();

        let result = manager
            .execute_with_retry(&ctx, move |_| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.ok(), Some(3));
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let manager = RecoveryManager::new().with_policy(fast_policy(2));
        let calls = &AtomicU32::new(0);
        let ctx = CancellationToken::new();

        let result: ResilienceResult<()> = manager
            .execute_with_retry(&ctx, move |_| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {n}"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.expect_err("should fail");
        assert_eq!(err.to_string(), "failure 3");
    }

    #[tokio::test]
    async fn test_policy_rejected_error_is_not_retried() {
        let policy = ConditionalPolicy::new(5, Duration::from_millis(1))
            .retry_on(|e| e.to_string().contains("transient"));
        let manager = RecoveryManager::new().with_policy(policy);
        let calls = &AtomicU32::new(0);
        let ctx = CancellationToken::new();

        let result: ResilienceResult<()> = manager
            .execute_with_retry(&ctx, move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("permanent")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff() {
        let manager =
            RecoveryManager::new().with_policy(FixedDelayPolicy::new(5, Duration::from_secs(30)));
        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result: ResilienceResult<()> =
            manager.execute_with_retry(&ctx, |_| async { Err("down") }).await;

        assert!(matches!(result, Err(ResilienceError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fallback_success_overrides_failure() {
        let manager = RecoveryManager::new().with_fallback(|_, error| async move {
            assert_eq!(error.to_string(), "primary down");
            Ok::<_, BoxedError>(())
        });
        let ctx = CancellationToken::new();

        let result = manager.execute_with_fallback(&ctx, |_| async { Err("primary down") }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fallback_error_replaces_original() {
        let manager = RecoveryManager::new()
            .with_fallback(|_, _| async { Err::<(), _>("fallback down") });
        let ctx = CancellationToken::new();

        let result = manager.execute_with_fallback(&ctx, |_| async { Err("primary down") }).await;
        assert_eq!(result.expect_err("fails").to_string(), "fallback down");
    }

    #[tokio::test]
    async fn test_retry_and_fallback_runs_fallback_once_after_retries() {
        let fallbacks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fallbacks);
        let manager = RecoveryManager::new().with_policy(fast_policy(2)).with_fallback(
            move |_, _| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxedError>(())
                }
            },
        );
        let calls = &AtomicU32::new(0);
        let ctx = CancellationToken::new();

        let result = manager
            .execute_with_retry_and_fallback(&ctx, move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_retry_skips_fallback() {
        let fallbacks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fallbacks);
        let manager = RecoveryManager::new().with_policy(fast_policy(3)).with_fallback(
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, BoxedError>(()) }
            },
        );
        let ctx = CancellationToken::new();

        let result = manager
            .execute_with_retry_and_fallback(&ctx, |token: CancellationToken| async move {
                token.cancel();
                Err("cancelled mid-flight")
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::Cancelled)));
        assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_state_tracking_counts_every_invocation() {
        let manager = RecoveryManager::new().with_policy(fast_policy(3)).with_state_tracking();
        let calls = &AtomicU32::new(0);
        let ctx = CancellationToken::new();

        manager
            .execute_with_retry(&ctx, move |_| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err("flaky")
                } else {
                    Ok(())
                }
            })
            .await
            .expect("eventually succeeds");

        let stats = manager.statistics().expect("tracking enabled");
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.failed_recoveries, 2);
        assert_eq!(stats.successful_recoveries, 1);
        assert_eq!(stats.consecutive_successes, 1);
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.recent_failures.len(), 2);
        assert_eq!(stats.recent_failures[1].attempt, 1);
        assert!(stats.last_success_time.is_some());

        manager.reset_statistics();
        assert_eq!(manager.statistics(), Some(RecoveryStatistics::default()));
    }

    #[tokio::test]
    async fn test_recent_failures_keep_last_ten() {
        let manager = RecoveryManager::new().with_state_tracking();
        let ctx = CancellationToken::new();

        for i in 0..15 {
            let _ = manager
                .execute_with_retry(&ctx, |_| async move { Err::<(), _>(format!("e{i}")) })
                .await;
        }

        let stats = manager.statistics().expect("tracking enabled");
        assert_eq!(stats.total_attempts, 15);
        assert_eq!(stats.consecutive_failures, 15);
        assert_eq!(stats.recent_failures.len(), RECENT_FAILURE_CAPACITY);
        assert_eq!(stats.recent_failures[0].error, "e5");
        assert_eq!(stats.recent_failures[9].error, "e14");
    }

    #[test]
    fn test_statistics_absent_without_tracking() {
        assert!(RecoveryManager::new().statistics().is_none());
    }
}
