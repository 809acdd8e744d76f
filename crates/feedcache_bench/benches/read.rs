//! Read path benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feedcache_bench::{open_seeded, runtime};
use rand::Rng;

/// Benchmark cached reads against decoding straight from the store.
fn bench_read(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("read");

    for count in [1_000usize, 10_000, 100_000].iter() {
        let (store, cache) = open_seeded(&rt, *count);
        let max_id = *count as i64;

        group.bench_with_input(BenchmarkId::new("cache", count), count, |b, _| {
            let mut rng = rand::thread_rng();
            b.iter(|| {
                let id = rng.gen_range(1..=max_id);
                black_box(cache.read(id).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("store", count), count, |b, _| {
            let mut rng = rand::thread_rng();
            b.iter(|| {
                let id = rng.gen_range(1..=max_id);
                black_box(store.get(id).unwrap());
            });
        });

        rt.block_on(cache.shutdown());
    }
    group.finish();
}

/// Benchmark misses, which skip the clone.
fn bench_miss(c: &mut Criterion) {
    let rt = runtime();
    let (_store, cache) = open_seeded(&rt, 10_000);

    c.bench_function("read_miss", |b| {
        b.iter(|| black_box(cache.read(black_box(-1)).is_err()));
    });

    rt.block_on(cache.shutdown());
}

criterion_group!(benches, bench_read, bench_miss);
criterion_main!(benches);
