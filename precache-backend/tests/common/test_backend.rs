//! Simple in-memory test backend implementation using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use precache_backend::{
    ActiveGeneration, Backend, BackendError, BackendResult, DeleteStatus, OpenStatus,
};
use precache_core::{BackendLabel, CachedResponse, GenerationId, RequestKey};
use std::sync::Arc;

type Bucket = DashMap<RequestKey, CachedResponse>;

/// Simple in-memory backend for testing using DashMap.
#[derive(Clone, Default)]
pub struct TestBackend {
    store: Arc<DashMap<GenerationId, Arc<Bucket>>>,
    active: ActiveGeneration,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus> {
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
        Ok(match self.store.remove(generation) {
            Some((_, bucket)) => DeleteStatus::Deleted(bucket.len() as u32),
            None => DeleteStatus::Missing,
        })
    }

    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>> {
        Ok(self
            .store
            .get(generation)
            .and_then(|bucket| bucket.get(key).map(|entry| entry.clone())))
    }

    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()> {
        let bucket = self
            .store
            .get(generation)
            .map(|bucket| bucket.clone())
            .ok_or_else(|| BackendError::MissingGeneration(generation.clone()))?;
        bucket.insert(key.clone(), value);
        Ok(())
    }

    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>> {
        Ok(self
            .store
            .get(generation)
            .map(|bucket| bucket.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default())
    }

    fn active(&self) -> &ActiveGeneration {
        &self.active
    }

    fn label(&self) -> BackendLabel {
        BackendLabel::new_static("test")
    }
}
