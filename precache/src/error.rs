//! Error types of the orchestration crate.

use std::path::PathBuf;
use std::time::Duration;

use http::StatusCode;
use precache_backend::BackendError;
use precache_core::{GenerationId, ManifestError, ResourceId};

use crate::worker::WorkerState;

/// A network fetch that produced no response.
///
/// `E` is the error type of the network adapter (a Tower service error, a
/// `reqwest_middleware::Error`, ...).
#[derive(Debug, thiserror::Error)]
pub enum FetchError<E> {
    /// The network adapter returned an error.
    #[error("network request failed: {0}")]
    Upstream(E),
    /// The configured fetch deadline expired.
    #[error("network request timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> FetchError<E> {
    /// Returns `true` when the fetch deadline expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

/// Why a single manifest resource could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// No response at all.
    #[error("{0}")]
    Network(String),
    /// The network answered, but not with a success status.
    #[error("responded with {0}")]
    Status(StatusCode),
}

/// A manifest resource that failed during install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    /// The resource as listed in the manifest.
    pub resource: ResourceId,
    /// What went wrong.
    pub reason: FailureReason,
}

impl std::fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.resource, self.reason)
    }
}

/// Install failed; the generation was not created.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// One or more manifest resources could not be fetched.
    #[error(
        "generation {generation} not installed: {} of {total} resources failed, first {}",
        .failures.len(),
        .failures.first().map(ToString::to_string).unwrap_or_default()
    )]
    Unreachable {
        /// The generation that was being installed.
        generation: GenerationId,
        /// Every failing resource in manifest order.
        failures: Vec<ResourceFailure>,
        /// Manifest size.
        total: usize,
    },
    /// Fetching succeeded but the store rejected the entries.
    #[error("generation {generation} not installed: store failed")]
    Backend {
        /// The generation that was being installed.
        generation: GenerationId,
        /// Store error.
        #[source]
        source: BackendError,
    },
}

impl InstallError {
    /// Resources that could not be fetched; empty for store failures.
    pub fn failed_resources(&self) -> Vec<&ResourceId> {
        match self {
            InstallError::Unreachable { failures, .. } => {
                failures.iter().map(|failure| &failure.resource).collect()
            }
            InstallError::Backend { .. } => Vec::new(),
        }
    }
}

/// Errors from driving a [`CacheWorker`](crate::CacheWorker).
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The requested transition is not allowed from the current state.
    #[error("cannot {operation} while worker is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// State the worker was in.
        state: WorkerState,
    },
    /// Install failed; the worker is now redundant.
    #[error(transparent)]
    Install(#[from] InstallError),
    /// Cleanup could not list generations.
    #[error("cleanup failed: {0}")]
    Cleanup(#[from] BackendError),
}

/// Errors loading [`PrecacheConfig`](crate::PrecacheConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The YAML is malformed or failed validation.
    #[error("invalid precache configuration: {0}")]
    Parse(String),
    /// A programmatic builder was given an invalid manifest or generation.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// A required builder field was not set.
    #[error("missing required field `{0}`")]
    Missing(&'static str),
}
