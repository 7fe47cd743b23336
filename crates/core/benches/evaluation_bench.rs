//! Outcome evaluation benchmarks
//!
//! Measures pattern compilation and evaluation over command output of
//! increasing size.
//!
//! Run with: `cargo bench --bench evaluation_bench -p recur-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recur_core::PatternMatcher;
use recur_domain::PatternConfig;

fn sample_output(lines: usize) -> String {
    (0..lines).map(|i| format!("[{i:05}] step completed in {}ms\n", i % 97)).collect()
}

fn matcher(config: PatternConfig) -> PatternMatcher {
    match PatternMatcher::new(&config) {
        Ok(matcher) => matcher,
        Err(err) => panic!("invalid benchmark pattern: {err}"),
    }
}

fn bench_compile(c: &mut Criterion) {
    let config = PatternConfig::success(r"all \d+ tests passed")
        .with_failure(r"(FATAL|panicked at|error\[E\d{4}\])")
        .case_insensitive(true);

    c.bench_function("pattern_compile", |b| {
        b.iter(|| PatternMatcher::new(black_box(&config)));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_result");

    let both = matcher(
        PatternConfig::success("ALL TESTS PASSED").with_failure("FATAL").case_insensitive(true),
    );
    let none = PatternMatcher::default();

    for lines in [10_usize, 1_000, 50_000] {
        let output = sample_output(lines);
        group.throughput(Throughput::Bytes(output.len() as u64));

        // Neither pattern matches, so the whole output is scanned twice.
        group.bench_with_input(BenchmarkId::new("no_match", lines), &output, |b, output| {
            b.iter(|| both.evaluate_result(black_box(output), 1));
        });

        let failing = format!("{output}FATAL: out of memory\n");
        group.bench_with_input(BenchmarkId::new("failure_match", lines), &failing, |b, output| {
            b.iter(|| both.evaluate_result(black_box(output), 0));
        });

        group.bench_with_input(BenchmarkId::new("exit_code_only", lines), &output, |b, output| {
            b.iter(|| none.evaluate_result(black_box(output), 0));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
