//! Benchmark utilities.

use feedcache_core::{CacheConfig, FeedCache};
use feedcache_store::MemoryRecordStore;
use feedcache_testkit::seeded_store;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Creates the runtime benchmarks drive the cache on.
pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("build runtime")
}

/// Seeds a store with `count` records and opens a cache over it.
pub fn open_seeded(runtime: &Runtime, count: usize) -> (MemoryRecordStore, FeedCache) {
    let store = seeded_store(count);
    let cache = runtime
        .block_on(FeedCache::open(
            Arc::new(store.clone()),
            CacheConfig::new("bench").with_initial_capacity(count),
        ))
        .expect("open cache");
    (store, cache)
}
