//! Benchmarks for the calcpad sandbox.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tokio::runtime::Runtime;

use calcpad_sandbox::prelude::*;

fn bench_config() -> SandboxConfig {
    SandboxConfig::builder()
        .timeout(Duration::from_secs(30))
        .build()
}

/// Benchmark building the registry and function index from scratch.
fn bench_library_startup(c: &mut Criterion) {
    let mut group = c.benchmark_group("library_startup");

    group.bench_function("registry_and_index", |b| {
        b.iter(|| black_box(Library::new(LibraryCatalog::default())));
    });

    group.finish();
}

/// Benchmark batch evaluation on the calling thread.
fn bench_execution(c: &mut Criterion) {
    let sandbox = CalcSandbox::new(bench_config());

    let mut group = c.benchmark_group("execution");

    // Simple arithmetic
    group.bench_function("simple_expression", |b| {
        let request = EvaluationRequest::new(["1 + 1"]);
        b.iter(|| black_box(sandbox.evaluate_blocking(&request)));
    });

    // Loop computation
    group.bench_function("loop_100", |b| {
        let request = EvaluationRequest::new(["total = 0", "for i in range(100): total += i", "total"]);
        b.iter(|| black_box(sandbox.evaluate_blocking(&request)));
    });

    // Library calls and a user function
    group.bench_function("library_calls", |b| {
        let request = EvaluationRequest::new([
            "def hyp(a, b): return math.sqrt(a ** 2 + b ** 2)",
            "[hyp(n, n + 1) for n in range(50)]",
            "statistics.stdev([1.5, 2.5, 2.5, 2.75, 3.25, 4.75])",
        ]);
        b.iter(|| black_box(sandbox.evaluate_blocking(&request)));
    });

    group.finish();
}

/// Benchmark the full async path, worker thread included.
fn bench_async_execution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let sandbox = CalcSandbox::new(bench_config());

    let mut group = c.benchmark_group("async_execution");

    group.bench_function("worker_round_trip", |b| {
        b.iter(|| {
            let result = rt
                .block_on(sandbox.evaluate(EvaluationRequest::new(["x = 2", "x ** 10"])))
                .unwrap();
            black_box(result)
        });
    });

    group.finish();
}

/// Benchmark concurrent batch throughput.
fn bench_concurrent_execution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent");
    group.sample_size(10);

    for concurrency in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*concurrency as u64));
        group.bench_with_input(
            BenchmarkId::new("batches", concurrency),
            concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    rt.block_on(async {
                        let mut handles = Vec::new();

                        for _ in 0..concurrency {
                            let handle = tokio::spawn(async move {
                                let sandbox = CalcSandbox::new(bench_config());
                                sandbox
                                    .evaluate(EvaluationRequest::new(["sum(range(1000))"]))
                                    .await
                                    .unwrap()
                            });
                            handles.push(handle);
                        }

                        for handle in handles {
                            let result = handle.await.unwrap();
                            black_box(result);
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

/// Benchmark function search by name and by phrase.
fn bench_search(c: &mut Criterion) {
    let library = Library::default();
    let matcher = library.matcher();

    let mut group = c.benchmark_group("search");

    for query in ["sqrt", "a", "np.log", "standard deviation"].iter() {
        group.bench_with_input(BenchmarkId::new("query", query), query, |b, query| {
            b.iter(|| black_box(matcher.search(query)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_library_startup,
    bench_execution,
    bench_async_execution,
    bench_concurrent_execution,
    bench_search,
);

criterion_main!(benches);
