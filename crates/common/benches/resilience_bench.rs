//! Resilience benchmarks
//!
//! Benchmarks for backoff calculation, circuit breaker execution paths and
//! error reporting.
//!
//! Run with: `cargo bench --bench resilience_bench -p recur-common
//! --features runtime`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use recur_common::observability::{ErrorReporter, ReporterConfig};
use recur_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, ExponentialBackoffPolicy, LinearBackoffPolicy,
    MockClock, RetryPolicy,
};
use recur_common::{BoxedError, ErrorCategory};
use tokio::runtime::Builder as RuntimeBuilder;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Backoff Benchmarks
// ============================================================================

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff_next_delay");

    let exponential =
        ExponentialBackoffPolicy::new(10, Duration::from_millis(100), 2.0, Duration::from_secs(30));
    let linear =
        LinearBackoffPolicy::new(10, Duration::from_millis(100), Duration::from_millis(250));

    for attempt in [1_u32, 5, 20, 1_000] {
        group.bench_with_input(BenchmarkId::new("exponential", attempt), &attempt, |b, &attempt| {
            b.iter(|| exponential.next_delay(black_box(attempt)));
        });
        group.bench_with_input(BenchmarkId::new("linear", attempt), &attempt, |b, &attempt| {
            b.iter(|| linear.next_delay(black_box(attempt)));
        });
    }

    group.finish();
}

// ============================================================================
// Circuit Breaker Benchmarks
// ============================================================================

fn bench_circuit_breaker(c: &mut Criterion) {
    let runtime = match RuntimeBuilder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => panic!("failed to build tokio runtime for benchmarks: {err}"),
    };
    let mut group = c.benchmark_group("circuit_breaker_execute");
    let ctx = CancellationToken::new();

    group.bench_function("closed_success", |b| {
        let breaker = match CircuitBreaker::new("bench", CircuitBreakerConfig::default()) {
            Ok(breaker) => breaker,
            Err(err) => panic!("invalid circuit breaker config: {err}"),
        };
        b.to_async(&runtime).iter(|| async {
            let _ = breaker.execute(&ctx, |_| async { Ok::<_, BoxedError>(black_box(1)) }).await;
        });
    });

    group.bench_function("open_rejection", |b| {
        let config =
            CircuitBreakerConfig { failure_threshold: 1, timeout: Duration::from_secs(3600) };
        let breaker = match CircuitBreaker::with_clock("bench", config, MockClock::new()) {
            Ok(breaker) => breaker,
            Err(err) => panic!("invalid circuit breaker config: {err}"),
        };
        breaker.record_failure();
        b.to_async(&runtime).iter(|| async {
            let _ = breaker.execute(&ctx, |_| async { Ok::<_, BoxedError>(()) }).await;
        });
    });

    group.bench_function("record_failure_success_cycle", |b| {
        let config = CircuitBreakerConfig {
            failure_threshold: 1_000_000,
            timeout: Duration::from_secs(1),
        };
        let breaker = match CircuitBreaker::new("bench", config) {
            Ok(breaker) => breaker,
            Err(err) => panic!("invalid circuit breaker config: {err}"),
        };
        b.iter(|| {
            breaker.record_failure();
            breaker.record_success();
        });
    });

    group.finish();
}

// ============================================================================
// Reporter Benchmarks
// ============================================================================

fn bench_reporter(c: &mut Criterion) {
    let mut group = c.benchmark_group("error_reporter");

    group.bench_function("report_error_text", |b| {
        let reporter =
            ErrorReporter::new(ReporterConfig::default()).with_sink(std::io::sink());
        b.iter(|| reporter.report_error(black_box("connection refused by upstream")));
    });

    group.bench_function("report_error_with_threshold", |b| {
        let reporter =
            ErrorReporter::new(ReporterConfig::default()).with_sink(std::io::sink());
        reporter.set_alert_threshold(ErrorCategory::Network, 1_000, Duration::from_secs(60));
        b.iter(|| reporter.report_error(black_box("connection refused by upstream")));
    });

    group.bench_function("get_trends_hour", |b| {
        let reporter = ErrorReporter::new(ReporterConfig {
            max_trend_entries: 5_000,
            ..Default::default()
        })
        .with_sink(std::io::sink());
        for i in 0..5_000 {
            let message = if i % 2 == 0 { "timed out" } else { "connection refused" };
            reporter.report_error(message);
        }
        b.iter(|| reporter.get_trends(black_box(Duration::from_secs(3600))));
    });

    group.finish();
}

criterion_group!(benches, bench_backoff, bench_circuit_breaker, bench_reporter);
criterion_main!(benches);
