// src/server/initialization.rs

//! Handles the complete service initialization process: deciding between a
//! snapshot-restored and a freshly built filter, then binding the listener.

use super::context::ServerContext;
use crate::config::{Config, LoadFailurePolicy};
use crate::core::BloomGuardError;
use crate::core::persistence::snapshot;
use crate::core::state::ServerState;
use crate::core::storage::BloomFilter;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Initializes all service components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    remove_leftover_temp_files(config.persistence.snapshot_path()).await;
    let filter = load_or_build(&config).await?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!(
        "bloomguard listening on {}",
        listener.local_addr().context("Listener has no local address")?
    );

    let state = ServerState::new(config, filter);
    info!("Server state initialized.");

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Produces the live filter: restored from the configured snapshot if one
/// exists, otherwise built from the configured expected element count and
/// false-positive probability.
///
/// A snapshot that exists but cannot be loaded is never treated as absent.
/// `persistence.on_load_failure` decides between aborting and starting fresh.
pub async fn load_or_build(config: &Config) -> Result<BloomFilter, BloomGuardError> {
    let path = config.persistence.snapshot_path();
    info!("Attempting to load snapshot from {}", path.display());

    match snapshot::load(path).await {
        Ok(filter) => {
            info!(
                "Restored filter from {}: {} bits, {} hash functions, {} bits set.",
                path.display(),
                filter.size(),
                filter.hash_count(),
                filter.count_ones()
            );
            warn_on_param_mismatch(config, &filter);
            Ok(filter)
        }
        Err(e) if e.is_not_found() => {
            info!(
                "No snapshot found at {}. Building a fresh filter.",
                path.display()
            );
            Ok(build_fresh(config))
        }
        Err(e) => match config.persistence.on_load_failure {
            LoadFailurePolicy::Fail => {
                error!(
                    "Snapshot at {} could not be loaded: {}. Refusing to start (on_load_failure = fail).",
                    path.display(),
                    e
                );
                Err(e)
            }
            LoadFailurePolicy::Fresh => {
                warn!(
                    "Snapshot at {} could not be loaded: {}. Starting with a fresh filter (on_load_failure = fresh).",
                    path.display(),
                    e
                );
                set_aside_unreadable_snapshot(path).await;
                Ok(build_fresh(config))
            }
        },
    }
}

fn build_fresh(config: &Config) -> BloomFilter {
    let params = config.filter.params();
    info!(
        "Bloom filter sized for {} elements at p={}: {} bits, {} hash functions.",
        config.filter.expected_elements,
        config.filter.false_positive_probability,
        params.size,
        params.hash_count
    );
    BloomFilter::new(params)
}

/// The snapshot's dimensions always win over the configuration, since
/// re-dimensioning would invalidate every bit already set.
fn warn_on_param_mismatch(config: &Config, filter: &BloomFilter) {
    let params = config.filter.params();
    if params.size != filter.size() || params.hash_count != filter.hash_count() {
        warn!(
            "Snapshot dimensions ({} bits, {} hashes) differ from the configured ones ({} bits, {} hashes). Using the snapshot.",
            filter.size(),
            filter.hash_count(),
            params.size,
            params.hash_count
        );
    }
}

/// Moves an unreadable snapshot out of the way so the next save does not destroy it.
async fn set_aside_unreadable_snapshot(path: &Path) {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt.{stamp}"));
    let backup = PathBuf::from(name);

    match tokio::fs::rename(path, &backup).await {
        Ok(()) => warn!("Moved unreadable snapshot to {}", backup.display()),
        Err(e) => error!(
            "Failed to move unreadable snapshot {} aside: {}. It will be overwritten on the next add.",
            path.display(),
            e
        ),
    }
}

/// Removes `<snapshot>.tmp.*` files left by a save that never reached its rename.
async fn remove_leftover_temp_files(snapshot_path: &Path) {
    let Some(file_name) = snapshot_path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let prefix = format!("{file_name}.tmp.");
    let dir = match snapshot_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Some(name) = entry.file_name().to_str()
            && name.starts_with(&prefix)
        {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => warn!(
                    "Removed leftover temporary snapshot '{}' from an interrupted save.",
                    entry.path().display()
                ),
                Err(e) => warn!(
                    "Failed to remove leftover temporary snapshot '{}': {}",
                    entry.path().display(),
                    e
                ),
            }
        }
    }
}

/// Filters larger than this many bits get a startup warning.
const LARGE_FILTER_WARN_BITS: u64 = 1 << 30;

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Filter target: {} expected elements, false-positive probability {}.",
        config.filter.expected_elements, config.filter.false_positive_probability
    );
    let params = config.filter.params();
    if params.size > LARGE_FILTER_WARN_BITS {
        warn!(
            "Configured filter needs {} bits ({} bytes); every add rewrites the full snapshot.",
            params.size,
            params.size / 8
        );
    }
    info!(
        "Snapshot path: {} (save timeout {} ms).",
        config.persistence.snapshot_path, config.persistence.save_timeout_ms
    );
}
