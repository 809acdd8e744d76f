//! Simulate command implementation.

use feedcache_core::{CacheConfig, FeedCache, RetryConfig};
use feedcache_store::MemoryRecordStore;
use feedcache_testkit::{random_records, wait_until, Workload, WorkloadReport};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Options for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Records seeded before the cache opens.
    pub records: usize,
    /// Mutations applied after the cache opens.
    pub mutations: usize,
    /// Whether to take the store offline halfway through.
    pub outage: bool,
    /// Change history retained by the store.
    pub history_limit: Option<usize>,
    /// How long to wait for convergence.
    pub timeout: Duration,
}

/// Simulation result.
#[derive(Debug, Serialize)]
pub struct SimulateResult {
    /// Records seeded before the cache opened.
    pub seeded: usize,
    /// Inserts applied by the workload.
    pub inserts: usize,
    /// Replaces and updates applied by the workload.
    pub updates: usize,
    /// Deletes applied by the workload.
    pub deletes: usize,
    /// Whether an outage was injected.
    pub outage: bool,
    /// Whether the cache matched the store before the timeout.
    pub converged: bool,
    /// Records in the cache at the end.
    pub cached: usize,
    /// Records in the store at the end.
    pub expected: usize,
    /// Ids whose cached value differs from the store.
    pub mismatched: usize,
    /// Change events applied.
    pub events_applied: u64,
    /// Subscriptions resumed from a token.
    pub resumes: u64,
    /// Snapshot reloads after startup.
    pub resyncs: u64,
    /// Feed failures recorded.
    pub feed_errors: u64,
    /// Wall time of the run.
    pub elapsed_ms: u64,
}

/// Runs the simulate command.
pub async fn run(options: SimulateOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let store = match options.history_limit {
        Some(limit) => MemoryRecordStore::with_history_limit(limit),
        None => MemoryRecordStore::new(),
    };
    store.insert_many(&random_records(options.records))?;

    let config = CacheConfig::new("simulation").with_retry(
        RetryConfig::new(Duration::from_millis(10)).with_max_delay(Duration::from_millis(200)),
    );
    let cache = FeedCache::open(Arc::new(store.clone()), config).await?;
    let mut workload = Workload::from_store(&store)?;

    let first_half = options.mutations / 2;
    let mut report = workload.run(&store, first_half)?;

    let rest = if options.outage {
        store.set_available(false);
        wait_until(options.timeout, || cache.healthcheck().is_err()).await;
        info!("store offline");
        let rest = workload.run(&store, options.mutations - first_half)?;
        store.set_available(true);
        info!("store back online");
        rest
    } else {
        workload.run(&store, options.mutations - first_half)?
    };
    report = merge(report, rest);

    let converged = wait_until(options.timeout, || {
        cache.healthcheck().is_ok() && mismatches(&cache, &workload) == 0
    })
    .await;

    let stats = cache.stats();
    let result = SimulateResult {
        seeded: options.records,
        inserts: report.inserts,
        updates: report.updates,
        deletes: report.deletes,
        outage: options.outage,
        converged,
        cached: cache.len(),
        expected: workload.expected().len(),
        mismatched: mismatches(&cache, &workload),
        events_applied: stats.events_applied,
        resumes: stats.resumes,
        resyncs: stats.resyncs,
        feed_errors: stats.feed_errors,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    cache.shutdown().await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    if converged {
        Ok(())
    } else {
        Err(format!("cache did not converge within {:?}", options.timeout).into())
    }
}

fn merge(a: WorkloadReport, b: WorkloadReport) -> WorkloadReport {
    WorkloadReport {
        inserts: a.inserts + b.inserts,
        updates: a.updates + b.updates,
        deletes: a.deletes + b.deletes,
    }
}

/// Counts ids that are missing, stale or extra in the cache.
fn mismatches(cache: &FeedCache, workload: &Workload) -> usize {
    let expected = workload.expected();
    let wrong = expected
        .iter()
        .filter(|(id, record)| cache.read(**id).as_ref() != Ok(*record))
        .count();
    wrong + cache.len().saturating_sub(expected.len())
}

fn print_text_output(result: &SimulateResult) {
    println!("=== Simulation ===");
    println!("Seeded:          {}", result.seeded);
    println!(
        "Mutations:       {} inserts, {} updates, {} deletes",
        result.inserts, result.updates, result.deletes
    );
    println!("Outage:          {}", if result.outage { "yes" } else { "no" });
    println!();
    println!("Cached records:  {}", result.cached);
    println!("Store records:   {}", result.expected);
    println!("Mismatched:      {}", result.mismatched);
    println!("Events applied:  {}", result.events_applied);
    println!("Resumes:         {}", result.resumes);
    println!("Resyncs:         {}", result.resyncs);
    println!("Feed errors:     {}", result.feed_errors);
    println!("Elapsed:         {} ms", result.elapsed_ms);
    println!();
    println!(
        "Result:          {}",
        if result.converged { "CONVERGED" } else { "DIVERGED" }
    );
}
