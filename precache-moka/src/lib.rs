//! In-memory generation store for precache, powered by [Moka](https://docs.rs/moka).
//!
//! Each generation is an unbounded `moka::future::Cache`; generations are
//! indexed in a `DashMap`. Entries never expire on their own and are only
//! removed when their whole generation is deleted. An optional byte quota
//! emulates the storage limit a hosting environment would enforce.
//!
//! ```
//! use precache_moka::MokaBackend;
//!
//! let backend = MokaBackend::builder()
//!     .label("assets")
//!     .quota_bytes(64 * 1024 * 1024)
//!     .build();
//! ```
#![warn(missing_docs)]

mod backend;
mod builder;
pub mod metrics;

pub use backend::MokaBackend;
pub use builder::MokaBackendBuilder;
