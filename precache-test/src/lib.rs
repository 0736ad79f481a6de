//! Test doubles shared by the precache integration tests.
//!
//! - [`MockBackend`](mock_backend::MockBackend) - generation store with
//!   operation counters and injectable faults
//! - [`MockNetwork`](mock_network::MockNetwork) - scripted network with a
//!   call log
//! - [`ManualOffload`](manual_offload::ManualOffload) - write-backs that
//!   run only when the test releases them
//! - [`tracing`] - span capture for asserting on instrumentation

pub mod manual_offload;
pub mod mock_backend;
pub mod mock_network;
pub mod tracing;

pub use manual_offload::ManualOffload;
pub use mock_backend::MockBackend;
pub use mock_network::MockNetwork;
