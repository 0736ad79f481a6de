//! Offline content cache for the [`reqwest`] HTTP client.
//!
//! [`PrecacheMiddleware`] plugs into [`reqwest_middleware`] and answers `GET`
//! requests from the current generation of a
//! [`CacheWorker`](precache::CacheWorker). Other methods go to the network
//! untouched.
//!
//! Requests issued through reqwest always carry absolute URLs, so the
//! worker configuration needs an `origin` whenever the manifest lists
//! origin-form paths; otherwise precached entries and intercepted requests
//! would be keyed differently.
//!
//! ```yaml
//! generation: app-v1
//! origin: https://app.example
//! manifest:
//!   - /
//!   - /assets/app.js
//! ```
//!
//! Install with [`ClientUpstream`], then wrap the client:
//!
//! ```ignore
//! let worker = CacheWorker::new(PrecacheConfig::from_path("precache.yaml")?, MokaBackend::builder().build());
//! let interceptor = worker.start(ClientUpstream::new(reqwest::Client::new())).await?;
//!
//! let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
//!     .with(PrecacheMiddleware::new(interceptor).with_status_header())
//!     .build();
//! ```

#![warn(missing_docs)]

pub mod middleware;
pub mod upstream;

pub use middleware::{CACHE_STATUS_HEADER, PrecacheMiddleware};
pub use upstream::{ClientUpstream, ReqwestUpstream};
