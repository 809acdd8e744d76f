//! Random write workloads against a memory store.
//!
//! A [`Workload`] keeps the collection contents it expects the store to
//! hold after every mutation, so a cache following the store can be
//! compared against it.

use crate::fixtures::random_record;
use feedcache_codec::{Record, RecordId};
use feedcache_store::{MemoryRecordStore, StoreResult};
use rand::Rng;
use std::collections::HashMap;

/// One write applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Insert a record with a fresh id.
    Insert(Record),
    /// Replace an existing record.
    Replace(Record),
    /// Update an existing record.
    Update(Record),
    /// Delete an existing record.
    Delete(RecordId),
}

/// Counts of mutations applied by [`Workload::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadReport {
    /// Inserts applied.
    pub inserts: usize,
    /// Replaces and updates applied.
    pub updates: usize,
    /// Deletes applied.
    pub deletes: usize,
}

impl WorkloadReport {
    /// Total mutations applied.
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

/// Random mutation generator with an expected-contents model.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    expected: HashMap<RecordId, Record>,
    next_id: RecordId,
}

impl Workload {
    /// Creates a workload over an empty collection.
    pub fn new() -> Self {
        Self {
            expected: HashMap::new(),
            next_id: 1,
        }
    }

    /// Creates a workload whose model starts from the store's contents.
    pub fn from_store(store: &MemoryRecordStore) -> StoreResult<Self> {
        let mut expected = HashMap::new();
        let mut next_id = 1;
        for id in store.ids() {
            if let Some(record) = store.get(id)? {
                next_id = next_id.max(id + 1);
                expected.insert(id, record);
            }
        }
        Ok(Self { expected, next_id })
    }

    /// Returns the contents the store should hold.
    pub fn expected(&self) -> &HashMap<RecordId, Record> {
        &self.expected
    }

    /// Picks the next mutation. Only inserts are generated while the model
    /// is empty.
    pub fn next_mutation(&mut self) -> Mutation {
        let mut rng = rand::thread_rng();
        if self.expected.is_empty() || rng.gen_bool(0.4) {
            let id = self.next_id;
            self.next_id += 1;
            return Mutation::Insert(random_record(id));
        }

        let ids: Vec<RecordId> = self.expected.keys().copied().collect();
        let id = ids[rng.gen_range(0..ids.len())];
        match rng.gen_range(0..3) {
            0 => Mutation::Replace(random_record(id)),
            1 => Mutation::Update(random_record(id)),
            _ => Mutation::Delete(id),
        }
    }

    /// Applies a mutation to the store and the model.
    pub fn apply(&mut self, store: &MemoryRecordStore, mutation: Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::Insert(record) => {
                store.insert(record.clone())?;
                self.next_id = self.next_id.max(record.id + 1);
                self.expected.insert(record.id, record);
            }
            Mutation::Replace(record) => {
                store.replace(record.clone())?;
                self.expected.insert(record.id, record);
            }
            Mutation::Update(record) => {
                store.update(record.clone())?;
                self.expected.insert(record.id, record);
            }
            Mutation::Delete(id) => {
                store.delete(id)?;
                self.expected.remove(&id);
            }
        }
        Ok(())
    }

    /// Applies `count` random mutations.
    pub fn run(&mut self, store: &MemoryRecordStore, count: usize) -> StoreResult<WorkloadReport> {
        let mut report = WorkloadReport::default();
        for _ in 0..count {
            let mutation = self.next_mutation();
            match &mutation {
                Mutation::Insert(_) => report.inserts += 1,
                Mutation::Replace(_) | Mutation::Update(_) => report.updates += 1,
                Mutation::Delete(_) => report.deletes += 1,
            }
            self.apply(store, mutation)?;
        }
        Ok(report)
    }
}
