#![warn(missing_docs)]
//! # precache-core
//!
//! Core traits and types for the precache offline content cache.
//!
//! This crate provides the vocabulary shared by the cache store
//! (`precache-backend`, `precache-moka`), the orchestration crate
//! (`precache`) and the protocol integrations (`precache-tower`,
//! `precache-reqwest`):
//!
//! - **Address** entries: [`GenerationId`], [`RequestKey`]
//! - **Declare** what to warm eagerly: [`ResourceId`], [`Manifest`]
//! - **Snapshot** responses: [`CachedResponse`]
//! - **Call** the network: [`Upstream`]
//! - **Execute** background work: [`Offload`]
//!
//! ## Storage addressing
//!
//! Every cached entry is addressed by a `(GenerationId, RequestKey)` pair.
//! Exactly one generation is current at a time; older ones are swept when a
//! new generation activates.

pub mod generation;
pub mod key;
pub mod label;
pub mod manifest;
pub mod offload;
pub mod response;
pub mod status;
pub mod upstream;

pub use generation::GenerationId;
pub use key::RequestKey;
pub use label::BackendLabel;
pub use manifest::{Manifest, ManifestError, Origin, ResourceId};
pub use offload::Offload;
pub use response::CachedResponse;
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use status::CacheStatus;
pub use upstream::Upstream;
