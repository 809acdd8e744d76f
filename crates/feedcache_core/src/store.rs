//! The in-memory mirror.

use feedcache_codec::{Record, RecordId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Map from record id to record, guarded by a reader-writer lock.
///
/// Readers never block each other. Every mutation is a single-key upsert
/// or remove under the write lock, so a reader sees either the old or the
/// new record, never a mix. There is no eviction: the map mirrors the whole
/// collection.
#[derive(Debug, Default)]
pub struct CacheStore {
    records: RwLock<HashMap<RecordId, Record>>,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store sized for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(HashMap::with_capacity(capacity))
    }

    /// Creates a store from a loaded snapshot.
    pub fn from_map(records: HashMap<RecordId, Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Looks up a record.
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records.read().get(&id).cloned()
    }

    /// Returns true if the id is present.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.read().contains_key(&id)
    }

    /// Inserts or wholesale replaces a record.
    pub fn upsert(&self, record: Record) {
        self.records.write().insert(record.id, record);
    }

    /// Removes a record. Returns false if it was absent.
    pub fn remove(&self, id: RecordId) -> bool {
        self.records.write().remove(&id).is_some()
    }

    /// Swaps in a freshly loaded snapshot, returning the previous size.
    pub fn replace_all(&self, records: HashMap<RecordId, Record>) -> usize {
        let previous = std::mem::replace(&mut *self.records.write(), records);
        previous.len()
    }

    /// Returns the number of cached records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns all cached ids in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<_> = self.records.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcache_codec::Category;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::thread;

    fn record(id: RecordId, number: i64) -> Record {
        Record::new(id, format!("user-{id}"), Category::B, number)
    }

    #[test]
    fn upsert_replaces_whole_record() {
        let store = CacheStore::new();
        store.upsert(Record::new(1, "old", Category::A, 1));
        store.upsert(Record::new(1, "new", Category::B, 2));

        assert_eq!(store.get(1), Some(Record::new(1, "new", Category::B, 2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let store = CacheStore::new();
        store.upsert(record(1, 1));
        assert!(store.remove(1));
        assert!(!store.remove(1));
        assert!(store.get(1).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn replace_all_drops_stale_ids() {
        let store = CacheStore::with_capacity(4);
        store.upsert(record(1, 1));
        store.upsert(record(2, 2));

        let fresh: HashMap<_, _> = [(3, record(3, 3))].into_iter().collect();
        assert_eq!(store.replace_all(fresh), 2);
        assert_eq!(store.ids(), vec![3]);
        assert!(!store.contains(1));
    }

    #[test]
    fn readers_run_alongside_writer() {
        let store = Arc::new(CacheStore::new());
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..1000 {
                    store.upsert(Record::new(1, format!("v{n}"), Category::A, n));
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1000 {
                    if let Some(r) = store.get(1) {
                        // Name and number are always written together
                        assert_eq!(r.name, format!("v{}", r.number));
                    }
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(store.get(1).unwrap().number, 999);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Upsert(RecordId, i64),
        Remove(RecordId),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..16i64, any::<i64>()).prop_map(|(id, n)| Op::Upsert(id, n)),
            (0..16i64).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn matches_model(ops in prop::collection::vec(op_strategy(), 0..128)) {
            let store = CacheStore::new();
            let mut model = BTreeMap::new();
            for op in ops {
                match op {
                    Op::Upsert(id, n) => {
                        store.upsert(record(id, n));
                        model.insert(id, n);
                    }
                    Op::Remove(id) => {
                        prop_assert_eq!(store.remove(id), model.remove(&id).is_some());
                    }
                }
            }
            prop_assert_eq!(store.ids(), model.keys().copied().collect::<Vec<_>>());
            for (id, n) in model {
                prop_assert_eq!(store.get(id).map(|r| r.number), Some(n));
            }
        }
    }
}
