use std::sync::Arc;

use async_trait::async_trait;
use precache_core::{BackendLabel, CachedResponse, GenerationId, RequestKey};

use crate::{ActiveGeneration, BackendError, DeleteStatus, OpenStatus};

/// Result alias used by every store operation.
pub type BackendResult<T> = Result<T, BackendError>;

/// A key/value entry store addressed by `(generation, request key)`.
///
/// Implementations must tolerate concurrent use: many intercepted requests
/// read and write at once, and a cleanup sweep may delete a stale generation
/// while requests are in flight. Writers of the same key are not coordinated;
/// the last completed write wins.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Creates the generation bucket if it does not exist yet.
    ///
    /// Reports whether the call created it, so a caller that fails halfway
    /// only removes what it created itself.
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus>;

    /// Lists every generation currently present in storage.
    async fn generations(&self) -> BackendResult<Vec<GenerationId>>;

    /// Purges a generation and all of its entries.
    async fn delete_generation(&self, generation: &GenerationId) -> BackendResult<DeleteStatus>;

    /// Looks up an entry. A missing generation is a miss, not an error.
    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>>;

    /// Stores an entry, replacing any previous snapshot under the same key.
    ///
    /// Never creates a generation: writing into one that was not opened, or
    /// was deleted in the meantime, fails with
    /// [`BackendError::MissingGeneration`].
    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()>;

    /// Lists the keys stored in a generation.
    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>>;

    /// Counts the entries stored in a generation.
    async fn entry_count(&self, generation: &GenerationId) -> BackendResult<usize> {
        Ok(self.keys(generation).await?.len())
    }

    /// The generation serving traffic from this store.
    ///
    /// Shared by every worker using the store, so a newer activation is
    /// visible to older workers and their interceptors.
    fn active(&self) -> &ActiveGeneration;

    /// Returns the label of this backend for logs and metrics.
    fn label(&self) -> BackendLabel {
        BackendLabel::new_static("backend")
    }
}

#[async_trait]
impl Backend for &dyn Backend {
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus> {
        (*self).open(generation).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationId>> {
        (*self).generations().await
    }

    async fn delete_generation(&self, generation: &GenerationId) -> BackendResult<DeleteStatus> {
        (*self).delete_generation(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>> {
        (*self).read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()> {
        (*self).write(generation, key, value).await
    }

    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>> {
        (*self).keys(generation).await
    }

    async fn entry_count(&self, generation: &GenerationId) -> BackendResult<usize> {
        (*self).entry_count(generation).await
    }

    fn active(&self) -> &ActiveGeneration {
        (*self).active()
    }

    fn label(&self) -> BackendLabel {
        (*self).label()
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus> {
        (**self).open(generation).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationId>> {
        (**self).generations().await
    }

    async fn delete_generation(&self, generation: &GenerationId) -> BackendResult<DeleteStatus> {
        (**self).delete_generation(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>> {
        (**self).read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()> {
        (**self).write(generation, key, value).await
    }

    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>> {
        (**self).keys(generation).await
    }

    async fn entry_count(&self, generation: &GenerationId) -> BackendResult<usize> {
        (**self).entry_count(generation).await
    }

    fn active(&self) -> &ActiveGeneration {
        (**self).active()
    }

    fn label(&self) -> BackendLabel {
        (**self).label()
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend + Send + 'static> {
    async fn open(&self, generation: &GenerationId) -> BackendResult<OpenStatus> {
        (**self).open(generation).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationId>> {
        (**self).generations().await
    }

    async fn delete_generation(&self, generation: &GenerationId) -> BackendResult<DeleteStatus> {
        (**self).delete_generation(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> BackendResult<Option<CachedResponse>> {
        (**self).read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
        value: CachedResponse,
    ) -> BackendResult<()> {
        (**self).write(generation, key, value).await
    }

    async fn keys(&self, generation: &GenerationId) -> BackendResult<Vec<RequestKey>> {
        (**self).keys(generation).await
    }

    async fn entry_count(&self, generation: &GenerationId) -> BackendResult<usize> {
        (**self).entry_count(generation).await
    }

    fn active(&self) -> &ActiveGeneration {
        (**self).active()
    }

    fn label(&self) -> BackendLabel {
        (**self).label()
    }
}
