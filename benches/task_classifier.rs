//! Benchmarks the pure-function task classifier against the <50ms-for-<=2KB
//! budget from spec.md §4.3.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use orchestrator_kernel::classification::task_classifier::classify;

const SHORT: &str = "Fix a typo in the README.";

const MEDIUM: &str = "We need to migrate the authentication service to use OAuth and JWT \
    tokens instead of session cookies. This touches the login flow, the token refresh \
    endpoint, and the production rollout plan for the payment service that depends on it.";

fn long_directive(repeats: usize) -> String {
    "Review the architecture migration plan for the encryption and compliance \
     rollout, then refactor the integration layer that handles PII. "
        .repeat(repeats)
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_classifier");

    group.bench_function(BenchmarkId::new("classify", "short"), |b| {
        b.iter(|| classify(SHORT));
    });

    group.bench_function(BenchmarkId::new("classify", "medium"), |b| {
        b.iter(|| classify(MEDIUM));
    });

    let near_2kb = long_directive(16);
    assert!(near_2kb.len() <= 2048);
    group.bench_function(BenchmarkId::new("classify", "near_2kb"), |b| {
        b.iter(|| classify(&near_2kb));
    });

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
