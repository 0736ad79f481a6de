//! Moka backend implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use moka::future::Cache;
use precache_backend::{
    ActiveGeneration, Backend, BackendError, BackendResult, DeleteStatus, OpenStatus,
};
use precache_core::{BackendLabel, CachedResponse, GenerationId, RequestKey};
use tracing::debug;

#[cfg(feature = "metrics")]
use crate::metrics::{MOKA_ENTRIES, MOKA_GENERATIONS};

type Generation = Cache<RequestKey, CachedResponse>;

/// In-memory generation store powered by Moka.
///
/// Every generation is its own unbounded Moka cache, so concurrent readers
/// never block each other and writers only contend on the key they touch.
/// The generation index is a `DashMap`; handles are cloned out of it before
/// any `.await` so no shard lock is held across suspension points.
///
/// # Caveats
///
/// - Data is **not persisted**: the store is lost on process restart
/// - Data is **not shared** across processes
/// - Entries do **not expire**; a generation only shrinks when it is deleted
///
/// # Examples
///
/// ```
/// use precache_moka::MokaBackend;
///
/// let backend = MokaBackend::builder().build();
/// ```
#[derive(Clone)]
pub struct MokaBackend {
    pub(crate) generations: Arc<DashMap<GenerationId, Generation>>,
    pub(crate) active: ActiveGeneration,
    pub(crate) label: BackendLabel,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) quota_bytes: Option<u64>,
}

impl std::fmt::Debug for MokaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("label", &self.label)
            .field("generations", &self.generations.len())
            .field("active", &self.active.get())
            .field("quota_bytes", &self.quota_bytes)
            .finish()
    }
}

impl MokaBackend {
    /// Creates a new builder for `MokaBackend`.
    pub fn builder() -> crate::builder::MokaBackendBuilder {
        crate::builder::MokaBackendBuilder::new()
    }

    /// Approximate number of bytes held across all generations.
    pub fn usage_bytes(&self) -> u64 {
        self.generations
            .iter()
            .map(|generation| {
                generation
                    .value()
                    .iter()
                    .map(|(_, value)| value.memory_size() as u64)
                    .sum::<u64>()
            })
            .sum()
    }

    fn new_generation(&self) -> Generation {
        let builder = Generation::builder();
        match self.initial_capacity {
            Some(capacity) => builder.initial_capacity(capacity).build(),
            None => builder.build(),
        }
    }

    fn generation(&self, generation: &GenerationId) -> Option<Generation> {
        self.generations.get(generation).map(|entry| entry.clone())
    }

    async fn check_quota(
        &self,
        generation: &Generation,
        key: &RequestKey,
        value: &CachedResponse,
    ) -> BackendResult<()> {
        let Some(quota) = self.quota_bytes else {
            return Ok(());
        };
        let replaced = generation
            .get(key)
            .await
            .map(|previous| previous.memory_size() as u64)
            .unwrap_or(0);
        let projected = self.usage_bytes().saturating_sub(replaced) + value.memory_size() as u64;
        if projected > quota {
            return Err(BackendError::QuotaExceeded(format!(
                "storing {key} needs {projected} bytes, quota is {quota}"
            )));
        }
        Ok(())
    }

    #[cfg(feature = "metrics")]
    fn record_gauges(&self, generation: &GenerationId, entries: usize) {
        metrics::gauge!(*MOKA_ENTRIES, "backend" => self.label.to_string(), "generation" => generation.to_string())
            .set(entries as f64);
        metrics::gauge!(*MOKA_GENERATIONS, "backend" => self.label.to_string())
            .set(self.generations.len() as f64);
    }
}

#[async_trait]
impl Backend for MokaBackend {
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus> {
        match self.generations.entry(generation.clone()) {
            Entry::Occupied(_) => Ok(OpenStatus::Existing),
            Entry::Vacant(slot) => {
                slot.insert(self.new_generation());
                debug!(%generation, backend = %self.label, "generation created");
                Ok(OpenStatus::Created)
            }
        }
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationId>> {
        Ok(self
            .generations
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn delete_generation(&self, generation: &GenerationId) -> BackendResult<DeleteStatus> {
        let Some((_, cache)) = self.generations.remove(generation) else {
            return Ok(DeleteStatus::Missing);
        };
        let entries = cache.iter().count();
        cache.invalidate_all();
        debug!(%generation, entries, backend = %self.label, "generation purged");
        #[cfg(feature = "metrics")]
        self.record_gauges(generation, 0);
        Ok(DeleteStatus::Deleted(entries as u32))
    }

    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>> {
        match self.generation(generation) {
            Some(cache) => Ok(cache.get(key).await),
            None => Ok(None),
        }
    }

    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()> {
        let cache = self
            .generation(generation)
            .ok_or_else(|| BackendError::MissingGeneration(generation.clone()))?;
        self.check_quota(&cache, key, &value).await?;
        cache.insert(key.clone(), value).await;
        #[cfg(feature = "metrics")]
        self.record_gauges(generation, cache.iter().count());
        Ok(())
    }

    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>> {
        Ok(self
            .generation(generation)
            .map(|cache| cache.iter().map(|(key, _)| key.as_ref().clone()).collect())
            .unwrap_or_default())
    }

    async fn entry_count(&self, generation: &GenerationId) -> BackendResult<usize> {
        Ok(self
            .generation(generation)
            .map(|cache| cache.iter().count())
            .unwrap_or(0))
    }

    fn active(&self) -> &ActiveGeneration {
        &self.active
    }

    fn label(&self) -> BackendLabel {
        self.label.clone()
    }
}
