// src/core/state/persistence.rs

//! Contains state definitions related to snapshot persistence.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Holds the snapshot location and the outcome of recent saves.
#[derive(Debug)]
pub struct PersistenceState {
    /// Where the snapshot is written after every add.
    pub snapshot_path: PathBuf,
    /// Upper bound on a single save before it is reported as failed.
    pub save_timeout: Duration,
    /// True while the snapshot on disk is missing an acknowledged add.
    pub is_stale: AtomicBool,
    /// The number of saves that have failed in a row.
    pub consecutive_failures: AtomicU64,
    /// The timestamp of the last successful save.
    pub last_save_success_time: Mutex<Option<Instant>>,
    /// The timestamp of the last failed save.
    pub last_save_failure_time: Mutex<Option<Instant>>,
}

impl PersistenceState {
    pub fn new(snapshot_path: PathBuf, save_timeout: Duration) -> Self {
        Self {
            snapshot_path,
            save_timeout,
            is_stale: AtomicBool::new(false),
            consecutive_failures: AtomicU64::new(0),
            last_save_success_time: Mutex::new(None),
            last_save_failure_time: Mutex::new(None),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn record_success(&self) {
        self.is_stale.store(false, Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.last_save_success_time.lock() = Some(Instant::now());
    }

    pub fn record_failure(&self) {
        self.is_stale.store(true, Ordering::SeqCst);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_save_failure_time.lock() = Some(Instant::now());
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale.load(Ordering::SeqCst)
    }
}
