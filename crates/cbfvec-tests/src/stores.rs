//! Vector store test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cbfvec_store::{
    CollectionInfo, MemoryStore, Payload, SearchHit, StoreError, StoreResult, VectorStore,
};
use uuid::Uuid;

/// One observed upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpsert {
    pub collection: String,
    pub id: Uuid,
    pub dimension: usize,
    pub payload: Payload,
}

/// A [`MemoryStore`] that records every call and can slow down lookups or
/// upserts.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    upserts: Mutex<Vec<RecordedUpsert>>,
    info_calls: AtomicUsize,
    create_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    upsert_delay: Option<Duration>,
    lookup_delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every upsert.
    pub fn with_upsert_delay(delay: Duration) -> Self {
        Self {
            upsert_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every collection lookup.
    pub fn with_lookup_delay(delay: Duration) -> Self {
        Self {
            lookup_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn upserts(&self) -> Vec<RecordedUpsert> {
        self.upserts.lock().expect("upsert log poisoned").clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().expect("upsert log poisoned").len()
    }

    /// Filenames of stored points, sorted.
    pub fn filenames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .upserts()
            .iter()
            .filter_map(|u| u.payload.get("filename").and_then(|v| v.as_str()).map(String::from))
            .collect();
        names.sort();
        names
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Largest number of upserts observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn collection_info(&self, name: &str) -> StoreResult<Option<CollectionInfo>> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.collection_info(name).await
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> StoreResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(name, dimension).await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Uuid,
        vector: Vec<f32>,
        payload: Payload,
    ) -> StoreResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.upsert_delay {
            tokio::time::sleep(delay).await;
        }

        let record = RecordedUpsert {
            collection: collection.to_string(),
            id,
            dimension: vector.len(),
            payload: payload.clone(),
        };
        let result = self.inner.upsert(collection, id, vector, payload).await;
        if result.is_ok() {
            self.upserts.lock().expect("upsert log poisoned").push(record);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<SearchHit>> {
        self.inner.search(collection, vector, limit).await
    }
}

/// Where a [`FailingStore`] fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// The collection lookup fails.
    Lookup,
    /// The lookup reports no collection and creation fails.
    Create,
    /// Upserts of the named file fail.
    UpsertFile(String),
    /// Every upsert fails.
    UpsertAll,
}

/// A [`RecordingStore`] that fails in a chosen place.
#[derive(Debug)]
pub struct FailingStore {
    inner: RecordingStore,
    mode: FailureMode,
    upsert_attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            inner: RecordingStore::new(),
            mode,
            upsert_attempts: AtomicUsize::new(0),
        }
    }

    /// Successful upserts.
    pub fn recorded(&self) -> &RecordingStore {
        &self.inner
    }

    /// Upsert calls, including failed ones.
    pub fn upsert_attempts(&self) -> usize {
        self.upsert_attempts.load(Ordering::SeqCst)
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Api {
            status: 503,
            body: format!("injected {} failure", what),
        }
    }
}

#[async_trait]
impl VectorStore for FailingStore {
    async fn collection_info(&self, name: &str) -> StoreResult<Option<CollectionInfo>> {
        match self.mode {
            FailureMode::Lookup => Err(Self::injected("lookup")),
            FailureMode::Create => Ok(None),
            _ => self.inner.collection_info(name).await,
        }
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> StoreResult<()> {
        if self.mode == FailureMode::Create {
            return Err(Self::injected("create"));
        }
        self.inner.create_collection(name, dimension).await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Uuid,
        vector: Vec<f32>,
        payload: Payload,
    ) -> StoreResult<()> {
        self.upsert_attempts.fetch_add(1, Ordering::SeqCst);
        let fail = match &self.mode {
            FailureMode::UpsertAll => true,
            FailureMode::UpsertFile(name) => {
                payload.get("filename").and_then(|v| v.as_str()) == Some(name.as_str())
            }
            _ => false,
        };
        if fail {
            return Err(Self::injected("upsert"));
        }
        self.inner.upsert(collection, id, vector, payload).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<SearchHit>> {
        self.inner.search(collection, vector, limit).await
    }
}
