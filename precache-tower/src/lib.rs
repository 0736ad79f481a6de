//! Tower middleware integration for precache.
//!
//! [`PrecacheLayer`] wraps any Tower HTTP service (a client such as
//! `hyper-util`'s, or an in-process handler) so that `GET` requests are
//! answered from the current generation and misses are fetched through the
//! wrapped service and written back in the background.
//!
//! # Quick Start
//!
//! ```ignore
//! use precache::{CacheWorker, PrecacheConfig};
//! use precache_moka::MokaBackend;
//! use precache_tower::{PrecacheLayer, TowerUpstream};
//! use tower::{ServiceBuilder, service_fn};
//!
//! let network = service_fn(fetch_from_origin);
//!
//! let worker = CacheWorker::new(config, MokaBackend::builder().build());
//! worker.install(TowerUpstream::new(network.clone())).await?;
//! worker.activate().await?;
//!
//! let service = ServiceBuilder::new()
//!     .layer(PrecacheLayer::new(worker.interceptor()?).with_status_header())
//!     .service(network);
//! ```
//!
//! # Response Headers
//!
//! With [`PrecacheLayer::with_status_header`] every response carries:
//!
//! | Header Value | Meaning |
//! |--------------|---------|
//! | `HIT`        | Served from the current generation |
//! | `MISS`       | Fetched from the network and written back |
//! | `BYPASS`     | Not a `GET`; passed through untouched |
//!
//! # Errors
//!
//! The service error is [`FetchError`](precache::FetchError): a cache miss
//! whose network call failed, or timed out when a fetch timeout is
//! configured.

#![warn(missing_docs)]

pub mod future;
pub mod layer;
pub mod service;
pub mod upstream;

pub use layer::{CACHE_STATUS_HEADER, PrecacheLayer};
pub use service::PrecacheService;
pub use upstream::{TowerError, TowerUpstream};
