//! Traits and structs for precache entry store interaction.
//!
//! If you want to implement your own store, you are in the right place.
//! A store keeps one bucket of entries per [`GenerationId`] and addresses
//! entries inside a bucket by [`RequestKey`].
//!
//! [`GenerationId`]: precache_core::GenerationId
//! [`RequestKey`]: precache_core::RequestKey
mod active;
mod backend;

pub use active::ActiveGeneration;
pub use backend::{Backend, BackendResult};
use precache_core::GenerationId;
use thiserror::Error;

/// Backend error describes general groups of errors in store interaction.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not bounded with network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    /// Network interaction error.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),
    /// The store refused the write, for example because a storage quota
    /// enforced by the environment was exceeded.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The generation was never opened or has been deleted since.
    #[error("generation {0} does not exist")]
    MissingGeneration(GenerationId),
}

/// Status of opening a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    /// The generation did not exist and was created empty.
    Created,
    /// The generation already existed; its entries are untouched.
    Existing,
}

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Generation deleted together with the given number of entries.
    Deleted(u32),
    /// Generation already missing.
    Missing,
}
