//! Lookup command implementation.

use feedcache_codec::{Record, RecordId};
use feedcache_core::{CacheConfig, FeedCache};
use feedcache_testkit::seeded_store;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of reading one id.
#[derive(Debug, Serialize)]
pub struct LookupResult {
    /// Requested id.
    pub id: RecordId,
    /// The record, if the read succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    /// The error, if the read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the lookup command.
pub async fn run(
    records: usize,
    ids: &[RecordId],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = seeded_store(records);
    let cache = FeedCache::open(Arc::new(store), CacheConfig::new("lookup")).await?;

    let results: Vec<LookupResult> = ids
        .iter()
        .map(|&id| match cache.read(id) {
            Ok(record) => LookupResult {
                id,
                record: Some(record),
                error: None,
            },
            Err(e) => LookupResult {
                id,
                record: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    cache.shutdown().await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        _ => {
            for result in &results {
                match (&result.record, &result.error) {
                    (Some(record), _) => println!(
                        "{:>6}  {:<12} {}  {}",
                        record.id, record.name, record.category, record.number
                    ),
                    (None, Some(error)) => println!("{:>6}  error: {}", result.id, error),
                    (None, None) => {}
                }
            }
        }
    }

    Ok(())
}
