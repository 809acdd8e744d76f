//! In-memory record store with a resumable change feed.

use crate::error::{StoreError, StoreResult};
use crate::token::ResumeToken;
use crate::traits::{
    ChangeStream, DocumentCursor, RawChange, RawDocument, RecordReader, RecordStore, RecordWriter,
};
use async_trait::async_trait;
use bytes::Bytes;
use feedcache_codec::{decode_record, encode_change, encode_record, ChangeEvent, Record, RecordId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Default number of change events retained for resumption.
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// An in-memory record store.
///
/// The store keeps encoded records, an append-only change log bounded by
/// a history limit, and a set of fault switches. It is suitable for:
/// - Unit and integration tests of change-feed consumers
/// - Benchmarks and simulations that should not need a database server
///
/// Handles are cheap to clone and share the same data.
///
/// # Fault injection
///
/// - [`set_available`](Self::set_available) fails counts, scans and
///   subscriptions, and breaks open streams on their next poll
/// - [`interrupt_streams`](Self::interrupt_streams) breaks currently open
///   streams once
/// - [`close_streams`](Self::close_streams) ends currently open streams
/// - [`fail_next_scans`](Self::fail_next_scans) breaks scans after their
///   first document
/// - [`fail_next_opens`](Self::fail_next_opens) rejects subscriptions
///
/// # Example
///
/// ```rust
/// use feedcache_codec::{Category, Record};
/// use feedcache_store::MemoryRecordStore;
///
/// let store = MemoryRecordStore::new();
/// store.insert(Record::new(1, "Alice", Category::A, 42)).unwrap();
/// assert_eq!(store.len(), 1);
/// assert_eq!(store.history_len(), 1);
/// ```
#[derive(Clone)]
pub struct MemoryRecordStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<StoreState>,
    /// Bumped on every append and fault change to wake waiting streams.
    signal: watch::Sender<u64>,
    history_limit: usize,
}

struct StoreState {
    documents: BTreeMap<RecordId, Bytes>,
    log: VecDeque<LoggedChange>,
    /// Sequence number of the most recent change (0 before the first one).
    last_sequence: u64,
    available: bool,
    interrupt_epoch: u64,
    close_epoch: u64,
    failing_scans: usize,
    failing_opens: usize,
}

struct LoggedChange {
    sequence: u64,
    payload: Bytes,
}

impl StoreState {
    /// Oldest sequence a subscriber can still resume after.
    fn oldest_resumable(&self) -> u64 {
        self.log
            .front()
            .map(|c| c.sequence - 1)
            .unwrap_or(self.last_sequence)
    }

    fn change_after(&self, sequence: u64) -> Option<&LoggedChange> {
        let first = self.log.front()?.sequence;
        if sequence + 1 < first {
            // Caller lagged behind trimming; report the first retained
            // change so the gap is detected.
            return self.log.front();
        }
        self.log.get((sequence + 1 - first) as usize)
    }
}

fn token_for(sequence: u64) -> ResumeToken {
    ResumeToken::from_bytes(sequence.to_be_bytes().to_vec())
}

fn sequence_of(token: &ResumeToken) -> StoreResult<u64> {
    let bytes: [u8; 8] = token
        .as_bytes()
        .try_into()
        .map_err(|_| StoreError::InvalidToken)?;
    Ok(u64::from_be_bytes(bytes))
}

impl MemoryRecordStore {
    /// Creates an empty store with the default history limit.
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Creates an empty store retaining at most `limit` change events.
    pub fn with_history_limit(limit: usize) -> Self {
        let (signal, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(StoreState {
                    documents: BTreeMap::new(),
                    log: VecDeque::new(),
                    last_sequence: 0,
                    available: true,
                    interrupt_epoch: 0,
                    close_epoch: 0,
                    failing_scans: 0,
                    failing_opens: 0,
                }),
                signal,
                history_limit: limit.max(1),
            }),
        }
    }

    /// Creates a store pre-populated with records.
    ///
    /// Seeding writes records directly, without change events.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> StoreResult<Self> {
        let store = Self::new();
        {
            let mut state = store.inner.state.write();
            for record in records {
                let bytes = Bytes::from(encode_record(&record)?);
                state.documents.insert(record.id, bytes);
            }
        }
        Ok(store)
    }

    /// Returns the number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.state.read().documents.len()
    }

    /// Returns true if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.inner.state.read().documents.is_empty()
    }

    /// Returns the ids of all stored documents in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.inner.state.read().documents.keys().copied().collect()
    }

    /// Returns the number of retained change events.
    pub fn history_len(&self) -> usize {
        self.inner.state.read().log.len()
    }

    /// Returns the sequence number of the latest change.
    pub fn last_sequence(&self) -> u64 {
        self.inner.state.read().last_sequence
    }

    /// Reads one record directly.
    pub fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        let state = self.inner.state.read();
        state
            .documents
            .get(&id)
            .map(|bytes| decode_record(bytes).map_err(StoreError::from))
            .transpose()
    }

    /// Inserts a new record and emits an insert event.
    pub fn insert(&self, record: Record) -> StoreResult<()> {
        let mut state = self.inner.state.write();
        if state.documents.contains_key(&record.id) {
            return Err(StoreError::DuplicateKey(record.id));
        }
        self.store_and_log(&mut state, record, ChangeEvent::insert)
    }

    /// Replaces an existing record and emits a replace event.
    pub fn replace(&self, record: Record) -> StoreResult<()> {
        self.overwrite(record, ChangeEvent::replace)
    }

    /// Updates an existing record and emits an update event carrying the
    /// post-image.
    pub fn update(&self, record: Record) -> StoreResult<()> {
        self.overwrite(record, ChangeEvent::update)
    }

    /// Deletes a record. Returns false if it did not exist.
    pub fn delete(&self, id: RecordId) -> StoreResult<bool> {
        let payload = Bytes::from(encode_change(&ChangeEvent::delete(id))?);
        let mut state = self.inner.state.write();
        if state.documents.remove(&id).is_none() {
            return Ok(false);
        }
        self.append(&mut state, payload);
        Ok(true)
    }

    /// Inserts a batch of records, emitting one insert event each.
    pub fn insert_many(&self, records: &[Record]) -> StoreResult<()> {
        let mut state = self.inner.state.write();
        if let Some(dup) = records.iter().find(|r| state.documents.contains_key(&r.id)) {
            return Err(StoreError::DuplicateKey(dup.id));
        }
        for record in records {
            self.store_and_log(&mut state, record.clone(), ChangeEvent::insert)?;
        }
        Ok(())
    }

    /// Stores raw bytes as a document without emitting an event.
    pub fn insert_raw_document(&self, id: RecordId, bytes: impl Into<Bytes>) {
        self.inner
            .state
            .write()
            .documents
            .insert(id, bytes.into());
    }

    /// Appends raw bytes to the change log as if the store had emitted them.
    pub fn push_raw_change(&self, payload: impl Into<Bytes>) {
        let mut state = self.inner.state.write();
        self.append(&mut state, payload.into());
    }

    /// Switches availability. While unavailable every read-side call fails
    /// and open streams fail on their next poll.
    pub fn set_available(&self, available: bool) {
        self.inner.state.write().available = available;
        self.notify();
    }

    /// Breaks every currently open change stream once.
    pub fn interrupt_streams(&self) {
        self.inner.state.write().interrupt_epoch += 1;
        self.notify();
    }

    /// Ends every currently open change stream cleanly.
    pub fn close_streams(&self) {
        self.inner.state.write().close_epoch += 1;
        self.notify();
    }

    /// Makes the next `count` scans fail after their first document.
    pub fn fail_next_scans(&self, count: usize) {
        self.inner.state.write().failing_scans = count;
    }

    /// Makes the next `count` subscriptions fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.inner.state.write().failing_opens = count;
    }

    fn overwrite(
        &self,
        record: Record,
        event: impl FnOnce(Record) -> ChangeEvent,
    ) -> StoreResult<()> {
        let mut state = self.inner.state.write();
        if !state.documents.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        self.store_and_log(&mut state, record, event)
    }

    fn store_and_log(
        &self,
        state: &mut StoreState,
        record: Record,
        event: impl FnOnce(Record) -> ChangeEvent,
    ) -> StoreResult<()> {
        let document = Bytes::from(encode_record(&record)?);
        let id = record.id;
        let payload = Bytes::from(encode_change(&event(record))?);
        state.documents.insert(id, document);
        self.append(state, payload);
        Ok(())
    }

    fn append(&self, state: &mut StoreState, payload: Bytes) {
        state.last_sequence += 1;
        let sequence = state.last_sequence;
        state.log.push_back(LoggedChange { sequence, payload });
        while state.log.len() > self.inner.history_limit {
            state.log.pop_front();
        }
        self.notify();
    }

    fn notify(&self) {
        self.inner.signal.send_modify(|version| *version += 1);
    }

    fn check_available(state: &StoreState) -> StoreResult<()> {
        if state.available {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store is offline"))
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn count_all(&self) -> StoreResult<u64> {
        let state = self.inner.state.read();
        Self::check_available(&state)?;
        Ok(state.documents.len() as u64)
    }

    async fn find_all(&self) -> StoreResult<Box<dyn DocumentCursor>> {
        let mut state = self.inner.state.write();
        Self::check_available(&state)?;
        let fail_after = if state.failing_scans > 0 {
            state.failing_scans -= 1;
            Some(1)
        } else {
            None
        };
        let documents = state.documents.values().cloned().collect();
        Ok(Box::new(MemoryCursor {
            documents,
            fail_after,
            yielded: 0,
        }))
    }

    async fn open_change_feed(
        &self,
        resume_after: Option<ResumeToken>,
    ) -> StoreResult<Box<dyn ChangeStream>> {
        let mut state = self.inner.state.write();
        Self::check_available(&state)?;
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(StoreError::unavailable("subscription rejected"));
        }

        let position = match resume_after {
            None => state.last_sequence,
            Some(token) => {
                let sequence = sequence_of(&token)?;
                if sequence > state.last_sequence {
                    return Err(StoreError::InvalidToken);
                }
                if sequence < state.oldest_resumable() {
                    return Err(StoreError::HistoryLost);
                }
                sequence
            }
        };
        debug!(position, "change stream opened");

        Ok(Box::new(MemoryChangeStream {
            store: self.clone(),
            signal: self.inner.signal.subscribe(),
            position,
            interrupt_epoch: state.interrupt_epoch,
            close_epoch: state.close_epoch,
        }))
    }
}

#[async_trait]
impl RecordReader for MemoryRecordStore {
    type Error = StoreError;

    async fn read(&self, id: RecordId) -> StoreResult<Record> {
        self.get(id)?.ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl RecordWriter for MemoryRecordStore {
    type Error = StoreError;

    async fn write(&self, records: &[Record]) -> StoreResult<()> {
        self.insert_many(records)
    }
}

/// Cursor over a point-in-time copy of the documents.
struct MemoryCursor {
    documents: VecDeque<Bytes>,
    fail_after: Option<usize>,
    yielded: usize,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn next(&mut self) -> StoreResult<Option<RawDocument>> {
        if self.fail_after.is_some_and(|n| self.yielded >= n) {
            return Err(StoreError::interrupted("scan cursor lost"));
        }
        let next = self.documents.pop_front();
        if next.is_none() && self.fail_after.is_some() {
            return Err(StoreError::interrupted("scan cursor lost"));
        }
        self.yielded += 1;
        Ok(next.map(|bytes| RawDocument { bytes }))
    }
}

/// A subscription reading the change log from a sequence position.
struct MemoryChangeStream {
    store: MemoryRecordStore,
    signal: watch::Receiver<u64>,
    /// Sequence of the last delivered change.
    position: u64,
    interrupt_epoch: u64,
    close_epoch: u64,
}

impl MemoryChangeStream {
    fn poll_change(&mut self) -> StoreResult<Option<Option<RawChange>>> {
        let state = self.store.inner.state.read();
        MemoryRecordStore::check_available(&state)?;
        if state.interrupt_epoch != self.interrupt_epoch {
            return Err(StoreError::interrupted("change stream reset"));
        }
        if state.close_epoch != self.close_epoch {
            return Ok(Some(None));
        }
        let Some(change) = state.change_after(self.position) else {
            return Ok(None);
        };
        if change.sequence != self.position + 1 {
            return Err(StoreError::HistoryLost);
        }
        self.position = change.sequence;
        Ok(Some(Some(RawChange {
            token: token_for(change.sequence),
            payload: change.payload.clone(),
        })))
    }
}

#[async_trait]
impl ChangeStream for MemoryChangeStream {
    async fn next(&mut self) -> StoreResult<Option<RawChange>> {
        loop {
            if let Some(outcome) = self.poll_change()? {
                return Ok(outcome);
            }
            if self.signal.changed().await.is_err() {
                return Ok(None);
            }
        }
    }

    fn resume_token(&self) -> Option<ResumeToken> {
        Some(token_for(self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcache_codec::{decode_change, Category, OperationType};
    use std::time::Duration;

    fn record(id: RecordId, number: i64) -> Record {
        Record::new(id, format!("user-{id}"), Category::A, number)
    }

    async fn next_event(stream: &mut Box<dyn ChangeStream>) -> ChangeEvent {
        let raw = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timed out")
            .unwrap()
            .expect("stream ended");
        decode_change(&raw.payload).unwrap()
    }

    #[test]
    fn writes_emit_events() {
        let store = MemoryRecordStore::new();
        store.insert(record(1, 10)).unwrap();
        store.update(record(1, 11)).unwrap();
        store.replace(record(1, 12)).unwrap();
        assert!(store.delete(1).unwrap());
        assert!(!store.delete(1).unwrap());

        assert_eq!(store.history_len(), 4);
        assert_eq!(store.last_sequence(), 4);
        assert!(store.is_empty());
    }

    #[test]
    fn write_constraints() {
        let store = MemoryRecordStore::new();
        store.insert(record(1, 10)).unwrap();
        assert_eq!(store.insert(record(1, 10)), Err(StoreError::DuplicateKey(1)));
        assert_eq!(store.update(record(2, 10)), Err(StoreError::NotFound(2)));
        assert_eq!(
            store.insert_many(&[record(3, 0), record(1, 0)]),
            Err(StoreError::DuplicateKey(1))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let store = MemoryRecordStore::with_history_limit(3);
        for id in 1..=5 {
            store.insert(record(id, id)).unwrap();
        }
        assert_eq!(store.history_len(), 3);
        assert_eq!(store.last_sequence(), 5);
    }

    #[tokio::test]
    async fn scan_sees_seeded_records() {
        let store = MemoryRecordStore::with_records((1..=3).map(|id| record(id, id))).unwrap();
        assert_eq!(store.count_all().await.unwrap(), 3);
        assert_eq!(store.history_len(), 0);

        let mut cursor = store.find_all().await.unwrap();
        let mut seen = 0;
        while let Some(doc) = cursor.next().await.unwrap() {
            feedcache_codec::decode_record(&doc.bytes).unwrap();
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[tokio::test]
    async fn failing_scan_breaks_mid_way() {
        let store = MemoryRecordStore::with_records((1..=3).map(|id| record(id, id))).unwrap();
        store.fail_next_scans(1);

        let mut cursor = store.find_all().await.unwrap();
        assert!(cursor.next().await.unwrap().is_some());
        assert!(matches!(
            cursor.next().await,
            Err(StoreError::Interrupted(_))
        ));

        let mut cursor = store.find_all().await.unwrap();
        assert!(cursor.next().await.unwrap().is_some());
        assert!(cursor.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stream_starts_at_subscription_point() {
        let store = MemoryRecordStore::new();
        store.insert(record(1, 1)).unwrap();

        let mut stream = store.open_change_feed(None).await.unwrap();
        store.insert(record(2, 2)).unwrap();

        let event = next_event(&mut stream).await;
        assert_eq!(event.operation, OperationType::Insert);
        assert_eq!(event.document_key, 2);
    }

    #[tokio::test]
    async fn resume_after_token_skips_delivered_events() {
        let store = MemoryRecordStore::new();
        let mut stream = store.open_change_feed(None).await.unwrap();
        store.insert(record(1, 1)).unwrap();
        store.insert(record(2, 2)).unwrap();
        store.insert(record(3, 3)).unwrap();

        next_event(&mut stream).await;
        let token = stream.resume_token().unwrap();
        drop(stream);

        let mut resumed = store.open_change_feed(Some(token)).await.unwrap();
        assert_eq!(next_event(&mut resumed).await.document_key, 2);
        assert_eq!(next_event(&mut resumed).await.document_key, 3);
    }

    #[tokio::test]
    async fn trimmed_history_cannot_be_resumed() {
        let store = MemoryRecordStore::with_history_limit(2);
        let stream = store.open_change_feed(None).await.unwrap();
        let token = stream.resume_token().unwrap();
        for id in 1..=3 {
            store.insert(record(id, id)).unwrap();
        }
        let err = store.open_change_feed(Some(token)).await.err().unwrap();
        assert_eq!(err, StoreError::HistoryLost);
    }

    #[tokio::test]
    async fn foreign_tokens_are_rejected() {
        let store = MemoryRecordStore::new();
        let err = store
            .open_change_feed(Some(ResumeToken::from_bytes(vec![1, 2, 3])))
            .await
            .err()
            .unwrap();
        assert_eq!(err, StoreError::InvalidToken);
    }

    #[tokio::test]
    async fn interruption_breaks_open_streams_only() {
        let store = MemoryRecordStore::new();
        let mut stream = store.open_change_feed(None).await.unwrap();
        store.interrupt_streams();
        assert!(matches!(stream.next().await, Err(StoreError::Interrupted(_))));

        let mut fresh = store.open_change_feed(None).await.unwrap();
        store.insert(record(1, 1)).unwrap();
        assert_eq!(next_event(&mut fresh).await.document_key, 1);
    }

    #[tokio::test]
    async fn close_ends_stream() {
        let store = MemoryRecordStore::new();
        let mut stream = store.open_change_feed(None).await.unwrap();
        store.close_streams();
        assert_eq!(stream.next().await, Ok(None));
    }

    #[tokio::test]
    async fn offline_store_fails_everything() {
        let store = MemoryRecordStore::new();
        let mut stream = store.open_change_feed(None).await.unwrap();
        store.set_available(false);

        assert!(matches!(stream.next().await, Err(StoreError::Unavailable(_))));
        assert!(store.count_all().await.is_err());
        assert!(store.find_all().await.is_err());
        assert!(store.open_change_feed(None).await.is_err());

        store.set_available(true);
        assert!(store.open_change_feed(None).await.is_ok());
    }

    #[tokio::test]
    async fn waiting_stream_wakes_on_write() {
        let store = MemoryRecordStore::new();
        let mut stream = store.open_change_feed(None).await.unwrap();

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.insert(record(9, 9)).unwrap();
        });

        assert_eq!(next_event(&mut stream).await.document_key, 9);
    }

    #[tokio::test]
    async fn direct_reader_and_writer() {
        let store = MemoryRecordStore::new();
        RecordWriter::write(&store, &[record(1, 1), record(2, 2)])
            .await
            .unwrap();
        assert_eq!(RecordReader::read(&store, 2).await.unwrap().number, 2);
        assert_eq!(
            RecordReader::read(&store, 3).await,
            Err(StoreError::NotFound(3))
        );
    }
}
