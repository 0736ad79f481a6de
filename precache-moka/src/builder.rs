//! Builder for configuring [`MokaBackend`].

use std::sync::Arc;

use dashmap::DashMap;
use precache_backend::ActiveGeneration;
use precache_core::BackendLabel;

use crate::backend::MokaBackend;

/// Builder for creating and configuring a [`MokaBackend`].
///
/// Use [`MokaBackend::builder`] to create a new builder instance.
///
/// # Examples
///
/// ```
/// use precache_moka::MokaBackend;
///
/// let backend = MokaBackend::builder()
///     .initial_capacity(64)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MokaBackendBuilder {
    label: BackendLabel,
    initial_capacity: Option<usize>,
    quota_bytes: Option<u64>,
}

impl MokaBackendBuilder {
    /// Creates a new builder with an unlimited quota.
    pub fn new() -> Self {
        Self {
            label: BackendLabel::new_static("moka"),
            initial_capacity: None,
            quota_bytes: None,
        }
    }

    /// Sets a custom label for this backend.
    ///
    /// # Default
    ///
    /// `"moka"`
    pub fn label(mut self, label: impl Into<BackendLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Pre-allocates room for `capacity` entries in every new generation.
    ///
    /// This is a sizing hint only; generations still grow without bound.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Limits the approximate number of bytes stored across all generations.
    ///
    /// Writes that would exceed the quota fail with
    /// [`BackendError::QuotaExceeded`](precache_backend::BackendError::QuotaExceeded).
    /// Nothing is evicted to make room.
    pub fn quota_bytes(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Builds the [`MokaBackend`].
    pub fn build(self) -> MokaBackend {
        MokaBackend {
            generations: Arc::new(DashMap::new()),
            active: ActiveGeneration::default(),
            label: self.label,
            initial_capacity: self.initial_capacity,
            quota_bytes: self.quota_bytes,
        }
    }
}

impl Default for MokaBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
