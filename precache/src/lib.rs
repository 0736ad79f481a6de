//! # precache
//!
//! An offline content cache. A named *generation* is filled from a manifest
//! of resources before it goes live, obsolete generations are swept when it
//! activates, and every outgoing `GET` is answered from the current
//! generation when possible, falling back to the network and storing what
//! the network returns.
//!
//! ## Building blocks
//!
//! - [`Installer`] - all-or-nothing population of a generation
//! - [`Cleanup`] - deletion of every generation but the current one
//! - [`Interceptor`] - cache-first resolution of a single request
//! - [`CacheWorker`] - the lifecycle tying the three together
//! - [`offload::OffloadManager`] - detached execution of write-backs
//!
//! ## Quick start
//!
//! ```ignore
//! use precache::{CacheWorker, PrecacheConfig};
//! use precache_moka::MokaBackend;
//!
//! let config = PrecacheConfig::builder()
//!     .generation("app-v1")
//!     .manifest(["/", "/assets/app.js"])
//!     .build()?;
//! let worker = CacheWorker::new(config, MokaBackend::builder().build());
//! let interceptor = worker.start(network.clone()).await?;
//!
//! let resolution = interceptor.intercept(request, network).await;
//! ```
//!
//! ## Integrations
//!
//! - `precache-tower` wraps a Tower service
//! - `precache-reqwest` plugs into `reqwest-middleware`

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cleanup;
pub mod config;
pub mod error;
pub mod events;
pub mod install;
pub mod interceptor;
pub mod metrics;
mod network;
pub mod offload;
pub mod worker;

pub use cleanup::{Cleanup, SweepReport};
pub use config::{PrecacheConfig, PrecacheConfigBuilder};
pub use error::{
    ConfigError, FailureReason, FetchError, InstallError, LifecycleError, ResourceFailure,
};
pub use events::{CacheEvent, Events};
pub use install::{InstallReport, Installer};
pub use interceptor::{Interceptor, Resolution};
pub use worker::{CacheWorker, WorkerState};

pub use precache_backend::{
    ActiveGeneration, Backend, BackendError, BackendResult, DeleteStatus, OpenStatus,
};
pub use precache_core::{
    CacheStatus, CachedResponse, GenerationId, Manifest, ManifestError, Offload, Origin,
    RequestKey, ResourceId, Upstream,
};
