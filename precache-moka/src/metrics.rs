//! Moka store utilization metrics.
//!
//! Enable the `metrics` feature to use these metrics.
//!
//! ## Metrics
//!
//! - `precache_moka_entries` - Entries in a generation (gauge)
//! - `precache_moka_generations` - Generations present in storage (gauge)
//!
//! Both metrics include a `backend` label to distinguish between multiple
//! Moka instances; the entry gauge also carries a `generation` label.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for the per-generation entry gauge.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "precache_moka_entries",
            "Current number of entries in a Moka generation."
        );
        "precache_moka_entries"
    };

    /// Metric name for the generation count gauge.
    pub static ref MOKA_GENERATIONS: &'static str = {
        metrics::describe_gauge!(
            "precache_moka_generations",
            "Current number of generations held by the Moka store."
        );
        "precache_moka_generations"
    };
}
