//! Snapshot and change-feed benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use feedcache_bench::{open_seeded, runtime};
use feedcache_core::{CacheConfig, FeedCache};
use feedcache_testkit::{seeded_store, wait_until, Workload};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark opening a cache, which is dominated by the snapshot scan.
fn bench_open(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("open");
    group.sample_size(20);

    for count in [1_000usize, 10_000, 50_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        let store = seeded_store(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let cache = FeedCache::open(Arc::new(store.clone()), CacheConfig::default())
                        .await
                        .unwrap();
                    cache.shutdown().await;
                });
            });
        });
    }
    group.finish();
}

/// Benchmark end-to-end propagation of a burst of writes.
fn bench_propagation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("propagation");
    group.sample_size(20);

    for burst in [100usize, 1_000].iter() {
        group.throughput(Throughput::Elements(*burst as u64));
        group.bench_with_input(BenchmarkId::from_parameter(burst), burst, |b, &burst| {
            let (store, cache) = open_seeded(&rt, 1_000);
            let mut workload = Workload::from_store(&store).unwrap();

            b.iter(|| {
                let target = cache.stats().events_applied + burst as u64;
                workload.run(&store, burst).unwrap();
                let applied = rt.block_on(wait_until(Duration::from_secs(10), || {
                    cache.stats().events_applied >= target
                }));
                assert!(applied);
            });

            rt.block_on(cache.shutdown());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_open, bench_propagation);
criterion_main!(benches);
