//! Metrics declaration.
//!
//! Enable the `metrics` feature to record these through the `metrics` facade.
//!
//! ## Interception
//!
//! - `precache_hit_total` / `precache_miss_total` / `precache_bypass_total` /
//!   `precache_unresolved_total` - per-request outcome counters
//! - `precache_write_back_failed_total` - absorbed write-back failures
//!
//! ## Lifecycle
//!
//! - `precache_install_total` - installs, labelled `result` = `ok` | `failed`
//! - `precache_swept_generations_total` - generations deleted by cleanup
//!
//! ## Offload
//!
//! - `precache_offload_tasks_spawned_total` / `precache_offload_tasks_finished_total`
//!   - write-back tasks, labelled by task `kind` (and `outcome` once finished)
//! - `precache_offload_tasks_active` / `precache_offload_task_duration_seconds`

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Requests served from the current generation.
    pub static ref HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_hit_total",
            "Total number of requests served from the current generation."
        );
        "precache_hit_total"
    };
    /// Requests fetched from the network after a miss.
    pub static ref MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_miss_total",
            "Total number of requests fetched from the network after a miss."
        );
        "precache_miss_total"
    };
    /// Requests passed through without cache interaction.
    pub static ref BYPASS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_bypass_total",
            "Total number of non-GET requests passed through untouched."
        );
        "precache_bypass_total"
    };
    /// Misses whose network fetch failed.
    pub static ref UNRESOLVED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_unresolved_total",
            "Total number of misses that could not be resolved by the network."
        );
        "precache_unresolved_total"
    };
    /// Write-backs that failed to reach the store.
    pub static ref WRITE_BACK_FAILED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_write_back_failed_total",
            "Total number of network responses that could not be written back."
        );
        "precache_write_back_failed_total"
    };
    /// Generation installs by result.
    pub static ref INSTALL_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_install_total",
            "Total number of generation installs, labelled by result."
        );
        "precache_install_total"
    };
    /// Generations removed by cleanup.
    pub static ref SWEPT_GENERATIONS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "precache_swept_generations_total",
            "Total number of obsolete generations deleted by cleanup."
        );
        "precache_swept_generations_total"
    };

    // Offload metrics

    /// Offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "precache_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "precache_offload_tasks_spawned_total"
    };
    /// Offload tasks that finished, labelled by `outcome`.
    pub static ref OFFLOAD_TASKS_FINISHED: &'static str = {
        metrics::describe_counter!(
            "precache_offload_tasks_finished_total",
            "Total number of offload tasks that finished, labelled by outcome (completed, cancelled or aborted)."
        );
        "precache_offload_tasks_finished_total"
    };
    /// Offload tasks currently running.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "precache_offload_tasks_active",
            "Number of offload tasks currently running."
        );
        "precache_offload_tasks_active"
    };
    /// Offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "precache_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "precache_offload_task_duration_seconds"
    };
}
