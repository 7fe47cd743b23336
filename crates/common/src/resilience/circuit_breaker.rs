//! Circuit breaker guarding a consistently failing target
//!
//! State machine:
//!
//! ```text
//!            failures >= threshold            timeout elapsed
//!  Closed ───────────────────────────▶ Open ─────────────────▶ HalfOpen
//!    ▲                                  ▲   (checked lazily)      │
//!    │            success               │        failure          │
//!    └──────────────────────────────────┼─────────────────────────┤
//!                                       └─────────────────────────┘
//! ```
//!
//! The failure counter only moves forward while `Closed`; a success in the
//! `Closed` state does not reset it. It is cleared by a success while
//! `HalfOpen` or by [`CircuitBreaker::reset`].
//!
//! [`CircuitBreaker::execute`] checks admissibility and records the outcome in
//! two separate critical sections and never holds the lock while the
//! operation runs. Concurrent callers may therefore all be admitted in the
//! same `Closed`/`HalfOpen` state, and `HalfOpen` probes are not limited to
//! one in flight.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use crate::error::BoxedError;
use crate::observability::ErrorReporter;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, letting probes through to test recovery
    HalfOpen,
}

impl CircuitState {
    /// Label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit
    pub failure_threshold: u64,
    /// Time to wait in `Open` before letting a probe through
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, timeout: Duration::from_secs(60) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time snapshot of a circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStatistics {
    pub name: String,
    pub state: CircuitState,
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub state_changed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    total_requests: u64,
    success_count: u64,
    failure_count: u64,
    opened_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    last_success_time: Option<DateTime<Utc>>,
    state_changed_at: DateTime<Utc>,
}

type Transition = (CircuitState, CircuitState);

impl BreakerState {
    fn transition(&mut self, to: CircuitState, now: DateTime<Utc>) -> Option<Transition> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.state_changed_at = now;
        Some((from, to))
    }
}

/// Three-state circuit breaker
///
/// Clones share state, so one breaker can be handed to several tasks.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<RwLock<BreakerState>>,
    clock: Arc<C>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
            reporter: self.reporter.clone(),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a circuit breaker using the system clock
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: C,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let name: String = name.into();
        let now = clock.utc_now();
        Ok(Self {
            name: Arc::from(name),
            config,
            inner: Arc::new(RwLock::new(BreakerState {
                state: CircuitState::Closed,
                total_requests: 0,
                success_count: 0,
                failure_count: 0,
                opened_at: None,
                last_failure_time: None,
                last_success_time: None,
                state_changed_at: now,
            })),
            clock: Arc::new(clock),
            reporter: None,
        })
    }

    /// Report state transitions to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Name used in log lines and rejections.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration this breaker was built with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Check admissibility, moving `Open` to `HalfOpen` once the timeout has
    /// elapsed. Admitted calls count towards `total_requests`.
    fn try_acquire(&self) -> bool {
        let (admitted, transition) = {
            let mut inner = self.inner.write();
            let mut transition = None;

            if inner.state == CircuitState::Open {
                let elapsed = inner
                    .opened_at
                    .map(|opened| self.clock.now().saturating_duration_since(opened))
                    .unwrap_or_default();
                if elapsed >= self.config.timeout {
                    transition = inner.transition(CircuitState::HalfOpen, self.clock.utc_now());
                }
            }

            let admitted = inner.state != CircuitState::Open;
            if admitted {
                inner.total_requests += 1;
            }
            (admitted, transition)
        };

        self.notify(transition);
        admitted
    }

    /// Whether a call would currently be admitted.
    ///
    /// Like [`execute`](Self::execute) this performs the lazy
    /// `Open -> HalfOpen` transition, but it does not count a request.
    pub fn can_execute(&self) -> bool {
        let transition = {
            let mut inner = self.inner.write();
            match (inner.state, inner.opened_at) {
                (CircuitState::Open, Some(opened))
                    if self.clock.now().saturating_duration_since(opened) >= self.config.timeout =>
                {
                    inner.transition(CircuitState::HalfOpen, self.clock.utc_now())
                }
                _ => None,
            }
        };
        self.notify(transition);
        self.state() != CircuitState::Open
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// Returns [`ResilienceError::CircuitOpen`] without invoking `operation`
    /// while the circuit is open. Otherwise the operation's outcome is
    /// recorded and its error is wrapped in [`ResilienceError::Operation`].
    #[instrument(skip(self, ctx, operation), fields(breaker = %self.name))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        ctx: &CancellationToken,
        operation: F,
    ) -> ResilienceResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxedError>,
    {
        if ctx.is_cancelled() {
            return Err(ResilienceError::Cancelled);
        }

        if !self.try_acquire() {
            debug!(breaker = %self.name, "circuit breaker rejecting call");
            return Err(ResilienceError::CircuitOpen { name: self.name.to_string() });
        }

        match operation(ctx.clone()).await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                let error = error.into();
                debug!(breaker = %self.name, error = %error, "circuit breaker: operation failed");
                self.record_failure();
                Err(ResilienceError::Operation(error))
            }
        }
    }

    /// Record a successful operation
    pub fn record_success(&self) {
        let transition = {
            let mut inner = self.inner.write();
            let now = self.clock.utc_now();
            inner.success_count += 1;
            inner.last_success_time = Some(now);

            match inner.state {
                CircuitState::HalfOpen => {
                    inner.failure_count = 0;
                    inner.opened_at = None;
                    inner.transition(CircuitState::Closed, now)
                }
                // Closed successes intentionally leave failure_count alone
                CircuitState::Closed | CircuitState::Open => None,
            }
        };

        if transition.is_some() {
            info!(breaker = %self.name, "circuit breaker closed after successful probe");
        }
        self.notify(transition);
    }

    /// Record a failed operation
    pub fn record_failure(&self) {
        let (failure_count, transition) = {
            let mut inner = self.inner.write();
            let now = self.clock.utc_now();
            inner.failure_count += 1;
            inner.last_failure_time = Some(now);

            let should_open = match inner.state {
                CircuitState::Closed => inner.failure_count >= self.config.failure_threshold,
                CircuitState::HalfOpen => true,
                CircuitState::Open => false,
            };

            let transition = if should_open {
                inner.opened_at = Some(self.clock.now());
                inner.transition(CircuitState::Open, now)
            } else {
                None
            };
            (inner.failure_count, transition)
        };

        if transition.is_some() {
            warn!(breaker = %self.name, failure_count, "circuit breaker opened");
        }
        self.notify(transition);
    }

    /// Force the circuit closed and zero the failure counter
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.inner.write();
            inner.failure_count = 0;
            inner.opened_at = None;
            inner.transition(CircuitState::Closed, self.clock.utc_now())
        };

        info!(breaker = %self.name, "circuit breaker manually reset");
        self.notify(transition);
    }

    /// Current state (without performing the lazy `Open -> HalfOpen` check)
    pub fn state(&self) -> CircuitState {
        self.inner.read().state
    }

    /// Current failure counter
    pub fn failure_count(&self) -> u64 {
        self.inner.read().failure_count
    }

    /// Consistent snapshot taken under the breaker's lock
    pub fn statistics(&self) -> CircuitBreakerStatistics {
        let inner = self.inner.read();
        CircuitBreakerStatistics {
            name: self.name.to_string(),
            state: inner.state,
            total_requests: inner.total_requests,
            success_count: inner.success_count,
            failure_count: inner.failure_count,
            last_failure_time: inner.last_failure_time,
            last_success_time: inner.last_success_time,
            state_changed_at: inner.state_changed_at,
        }
    }

    fn notify(&self, transition: Option<Transition>) {
        let Some((from, to)) = transition else {
            return;
        };
        debug!(
            breaker = %self.name,
            old_state = %from,
            new_state = %to,
            "circuit breaker state change"
        );
        if let Some(reporter) = &self.reporter {
            reporter.log_circuit_breaker_state_change(&self.name, from, to);
        }
    }
}
