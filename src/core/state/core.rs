// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding the live filter and
//! serializing every mutation with the snapshot write that follows it.

use super::persistence::PersistenceState;
use crate::config::Config;
use crate::core::BloomGuardError;
use crate::core::metrics;
use crate::core::persistence::{Snapshot, snapshot};
use crate::core::storage::{BloomFilter, params};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Whether the durable copy reflects an acknowledged add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Durability {
    /// The snapshot on disk includes the add.
    Persisted,
    /// The add is in memory only; the snapshot on disk predates it.
    Stale { reason: String },
}

/// The result of adding an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// True if at least one bit flipped, i.e. the item was not already reported present.
    pub newly_added: bool,
    pub durability: Durability,
}

/// Read-only statistics about the live filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInfo {
    pub size: u64,
    pub hash_count: u32,
    pub bits_set: u64,
    pub fill_ratio: f64,
    pub estimated_false_positive_rate: f64,
    /// The false-positive rate the filter reaches once it holds `expected_elements` items.
    pub design_false_positive_rate: f64,
    pub expected_elements: u64,
    pub target_false_positive_probability: f64,
    pub snapshot_stale: bool,
}

/// The central struct holding all shared, service-wide state.
/// This struct is wrapped in an `Arc` and passed to every request handler.
#[derive(Debug)]
pub struct ServerState {
    /// The configuration resolved at startup. Never reloaded.
    pub config: Config,
    /// The live filter. Checks share the read lock; an add and its snapshot
    /// save hold the write lock together.
    filter: RwLock<BloomFilter>,
    /// Holds all state related to snapshot persistence.
    pub persistence: PersistenceState,
}

impl ServerState {
    pub fn new(config: Config, filter: BloomFilter) -> Arc<Self> {
        metrics::BITS_SET.set(filter.count_ones() as f64);
        let persistence = PersistenceState::new(
            config.persistence.snapshot_path().to_path_buf(),
            config.persistence.save_timeout(),
        );
        Arc::new(Self {
            config,
            filter: RwLock::new(filter),
            persistence,
        })
    }

    /// Adds `item` and writes a full snapshot before returning.
    ///
    /// Holding the write lock across the save means only one mutator runs at
    /// a time and every completed save contains all adds acknowledged before
    /// it. A failed save does not undo the in-memory add; it is reported as
    /// [`Durability::Stale`].
    pub async fn add(&self, item: &[u8]) -> AddOutcome {
        let mut filter = self.filter.write().await;
        let newly_added = filter.add(item);
        metrics::ADDS_TOTAL.inc();
        metrics::BITS_SET.set(filter.count_ones() as f64);

        let snapshot = Snapshot::encode(&*filter);
        let durability = match self.persist(&snapshot).await {
            Ok(()) => Durability::Persisted,
            Err(e) => Durability::Stale {
                reason: e.to_string(),
            },
        };
        AddOutcome {
            newly_added,
            durability,
        }
    }

    /// Returns true if `item` is possibly present, false if it is definitely absent.
    pub async fn check(&self, item: &[u8]) -> bool {
        let present = self.filter.read().await.check(item);
        let verdict = if present { "possibly_present" } else { "absent" };
        metrics::CHECKS_TOTAL.with_label_values(&[verdict]).inc();
        present
    }

    /// Encodes the current state in snapshot form.
    pub async fn structure(&self) -> Snapshot {
        Snapshot::encode(&*self.filter.read().await)
    }

    pub async fn info(&self) -> FilterInfo {
        let filter = self.filter.read().await;
        let filter_config = &self.config.filter;
        FilterInfo {
            size: filter.size(),
            hash_count: filter.hash_count(),
            bits_set: filter.count_ones(),
            fill_ratio: filter.fill_ratio(),
            estimated_false_positive_rate: filter.estimated_false_positive_rate(),
            design_false_positive_rate: params::expected_false_positive_rate(
                filter.size(),
                filter.hash_count(),
                filter_config.expected_elements,
            ),
            expected_elements: filter_config.expected_elements,
            target_false_positive_probability: filter_config.false_positive_probability,
            snapshot_stale: self.persistence.is_stale(),
        }
    }

    /// Rewrites the snapshot if an earlier save left it stale.
    pub async fn flush_if_stale(&self) -> Result<(), BloomGuardError> {
        if !self.persistence.is_stale() {
            return Ok(());
        }
        // Exclusive, so the flush cannot interleave with an add.
        let filter = self.filter.write().await;
        let snapshot = Snapshot::encode(&*filter);
        self.persist(&snapshot).await
    }

    /// Saves `snapshot`, bounding its write by the configured timeout, and records the outcome.
    async fn persist(&self, snapshot: &Snapshot) -> Result<(), BloomGuardError> {
        let start_time = Instant::now();
        let path = self.persistence.snapshot_path();
        let timeout = self.persistence.save_timeout;

        // Only the staging write is bounded; the rename always completes
        // before the write lock is released.
        let result = snapshot::save_with_timeout(snapshot, path, timeout).await;
        metrics::SNAPSHOT_SAVE_SECONDS.observe(start_time.elapsed().as_secs_f64());

        match &result {
            Ok(()) => {
                self.persistence.record_success();
                metrics::SNAPSHOT_SAVES_TOTAL.inc();
                metrics::SNAPSHOT_STALE.set(0.0);
                debug!("Snapshot saved to {}", path.display());
            }
            Err(e) => {
                self.persistence.record_failure();
                metrics::SNAPSHOT_SAVE_FAILURES_TOTAL.inc();
                metrics::SNAPSHOT_STALE.set(1.0);
                warn!(
                    "Snapshot save to {} failed, durable copy is stale: {}",
                    path.display(),
                    e
                );
            }
        }
        result
    }
}
