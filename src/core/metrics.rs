// src/core/metrics.rs

//! Defines and registers Prometheus metrics for service monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};

lazy_static! {
    // --- Filter Gauges ---
    /// The number of set bits in the live filter.
    pub static ref BITS_SET: Gauge =
        register_gauge!("bloomguard_bits_set", "Number of set bits in the Bloom filter.").unwrap();
    /// Indicates whether the snapshot on disk lags behind the in-memory filter.
    pub static ref SNAPSHOT_STALE: Gauge =
        register_gauge!("bloomguard_snapshot_stale", "Snapshot on disk is stale (1 for true, 0 for false).").unwrap();


    // --- Request Counters ---
    /// The total number of add requests applied to the filter.
    pub static ref ADDS_TOTAL: Counter =
        register_counter!("bloomguard_adds_total", "Total number of items added.").unwrap();
    /// The total number of membership checks, labeled by verdict.
    pub static ref CHECKS_TOTAL: CounterVec =
        register_counter_vec!("bloomguard_checks_total", "Total number of membership checks, labeled by verdict.", &["verdict"]).unwrap();


    // --- Persistence ---
    /// The total number of snapshots written successfully.
    pub static ref SNAPSHOT_SAVES_TOTAL: Counter =
        register_counter!("bloomguard_snapshot_saves_total", "Total number of successful snapshot saves.").unwrap();
    /// The total number of snapshot saves that failed or timed out.
    pub static ref SNAPSHOT_SAVE_FAILURES_TOTAL: Counter =
        register_counter!("bloomguard_snapshot_save_failures_total", "Total number of failed snapshot saves.").unwrap();
    /// A histogram of snapshot save latencies.
    pub static ref SNAPSHOT_SAVE_SECONDS: Histogram =
        register_histogram!("bloomguard_snapshot_save_seconds", "Latency of snapshot saves in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
