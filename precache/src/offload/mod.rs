//! Background execution of write-back tasks.
//!
//! The interceptor answers from the network first and persists the response
//! afterwards. That second half runs here, detached from the request, so the
//! caller never waits for the store.
//!
//! ```ignore
//! use precache::offload::{OffloadConfig, OffloadManager};
//!
//! let manager = OffloadManager::new(OffloadConfig::default());
//! manager.spawn("write_back", async {
//!     // persist the snapshot
//! });
//! manager.wait_all().await;
//! ```

mod manager;
mod policy;

pub use manager::{OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, TimeoutPolicy};
