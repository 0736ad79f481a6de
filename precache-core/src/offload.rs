//! Offload trait for background task execution.
//!
//! This module provides the [`Offload`] trait which abstracts over
//! different implementations for spawning detached background tasks.

use std::future::Future;

use smol_str::SmolStr;

/// Trait for spawning background tasks.
///
/// The interceptor uses it to persist network responses without blocking the
/// response path ("write-back"). The primary implementation is
/// `OffloadManager` in the `precache` crate, which adds timeout policies,
/// task tracking and tracing spans.
///
/// # Clone bound
///
/// Implementors should use `Arc` internally so that all cloned instances
/// share the same configuration and state.
///
/// # Example
///
/// ```ignore
/// use precache_core::Offload;
///
/// fn offload_write_back<O: Offload>(offload: &O, key: String) {
///     offload.spawn("write_back", async move {
///         println!("persisting {key}");
///     });
/// }
/// ```
pub trait Offload: Send + Sync + Clone {
    /// Spawn a future to be executed in the background.
    ///
    /// # Arguments
    ///
    /// * `kind` - A label categorizing the task (e.g. "write_back").
    ///   Used for metrics and tracing.
    /// * `future` - The future to execute. Must be `Send + 'static` as it may
    ///   run on a different thread after the caller has returned.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
