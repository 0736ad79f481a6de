use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use precache_backend::{
    ActiveGeneration, Backend, BackendError, BackendResult, DeleteStatus, OpenStatus,
};
use precache_core::{BackendLabel, CachedResponse, GenerationId, RequestKey};

type Bucket = DashMap<RequestKey, CachedResponse>;

#[derive(Debug, Default)]
pub struct BackendCounters {
    pub open_count: AtomicUsize,
    pub read_count: AtomicUsize,
    pub read_hit_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub delete_count: AtomicUsize,
}

impl BackendCounters {
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn read_hit_count(&self) -> usize {
        self.read_hit_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.delete_count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.open_count.store(0, Ordering::SeqCst);
        self.read_count.store(0, Ordering::SeqCst);
        self.read_hit_count.store(0, Ordering::SeqCst);
        self.write_count.store(0, Ordering::SeqCst);
        self.delete_count.store(0, Ordering::SeqCst);
    }
}

/// Faults the mock injects on demand.
#[derive(Debug, Default)]
pub struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_writes_after: AtomicUsize,
    undeletable: DashSet<GenerationId>,
}

/// In-memory store counting every operation.
#[derive(Clone, Debug, Default)]
pub struct MockBackend {
    pub store: Arc<DashMap<GenerationId, Arc<Bucket>>>,
    pub counters: Arc<BackendCounters>,
    faults: Arc<Faults>,
    active: ActiveGeneration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read fail until switched off again.
    pub fn fail_reads(&self, enabled: bool) {
        self.faults.fail_reads.store(enabled, Ordering::SeqCst);
    }

    /// Makes every write fail until switched off again.
    pub fn fail_writes(&self, enabled: bool) {
        self.faults.fail_writes.store(enabled, Ordering::SeqCst);
    }

    /// Lets `count` more writes succeed, then fails the rest.
    pub fn fail_writes_after(&self, count: usize) {
        self.faults.fail_writes_after.store(count, Ordering::SeqCst);
        self.faults.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes deleting `generation` fail.
    pub fn refuse_delete(&self, generation: GenerationId) {
        self.faults.undeletable.insert(generation);
    }

    pub fn read_count(&self) -> usize {
        self.counters.read_count()
    }

    pub fn write_count(&self) -> usize {
        self.counters.write_count()
    }

    pub fn delete_count(&self) -> usize {
        self.counters.delete_count()
    }

    /// Total number of entries across all generations.
    pub fn total_entries(&self) -> usize {
        self.store.iter().map(|bucket| bucket.len()).sum()
    }

    /// Stores `response` directly, bypassing counters and faults.
    pub fn seed(&self, generation: &GenerationId, key: RequestKey, response: CachedResponse) {
        self.store
            .entry(generation.clone())
            .or_default()
            .insert(key, response);
    }

    fn bucket(&self, generation: &GenerationId) -> Option<Arc<Bucket>> {
        self.store.get(generation).map(|bucket| bucket.clone())
    }

    fn write_fault(&self) -> bool {
        if !self.faults.fail_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.faults
            .fail_writes_after
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_err()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus> {
        self.counters.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(match self.store.entry(generation.clone()) {
            Entry::Occupied(_) => OpenStatus::Existing,
            Entry::Vacant(slot) => {
                slot.insert(Arc::default());
                OpenStatus::Created
            }
        })
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationId>> {
        Ok(self.store.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn delete_generation(&self, generation: &GenerationId) -> BackendResult<DeleteStatus> {
        self.counters.delete_count.fetch_add(1, Ordering::SeqCst);
        if self.faults.undeletable.contains(generation) {
            return Err(BackendError::InternalError(
                format!("generation {generation} is locked").into(),
            ));
        }
        match self.store.remove(generation) {
            Some((_, bucket)) => Ok(DeleteStatus::Deleted(bucket.len() as u32)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::ConnectionError("store unavailable".into()));
        }
        let result = self
            .bucket(generation)
            .and_then(|bucket| bucket.get(key).map(|entry| entry.value().clone()));
        if result.is_some() {
            self.counters.read_hit_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(result)
    }

    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        if self.write_fault() {
            return Err(BackendError::QuotaExceeded(format!("no room for {key}")));
        }
        let bucket = self
            .bucket(generation)
            .ok_or_else(|| BackendError::MissingGeneration(generation.clone()))?;
        bucket.insert(key.clone(), value);
        Ok(())
    }

    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>> {
        Ok(self
            .bucket(generation)
            .map(|bucket| bucket.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default())
    }

    fn active(&self) -> &ActiveGeneration {
        &self.active
    }

    fn label(&self) -> BackendLabel {
        BackendLabel::new_static("mock")
    }
}
