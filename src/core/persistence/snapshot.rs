// src/core/persistence/snapshot.rs

//! Implements the JSON snapshot format used to persist the Bloom filter.
//!
//! A snapshot is a structural copy of the filter with its bits written as
//! `0`/`1` integers:
//!
//! ```json
//! {"bitArray":[0,1,0,...],"bitArraySize":959,"hashFunctionCount":7}
//! ```
//!
//! Snapshots are always written in full. `save` streams the document to a
//! temporary sibling file and renames it over the destination, so a reader
//! never observes a half-written snapshot.

use crate::core::BloomGuardError;
use crate::core::storage::{BloomFilter, ProbeHasher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

/// The persisted projection of a [`BloomFilter`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(rename = "bitArray", alias = "bits")]
    pub bit_array: Vec<i64>,
    #[serde(rename = "bitArraySize", alias = "size")]
    pub bit_array_size: u64,
    #[serde(rename = "hashFunctionCount", alias = "hashCount")]
    pub hash_function_count: u64,
}

impl Snapshot {
    /// Encodes the filter's full state.
    pub fn encode<H: ProbeHasher>(filter: &BloomFilter<H>) -> Self {
        Self {
            bit_array: filter.bits().map(i64::from).collect(),
            bit_array_size: filter.size(),
            hash_function_count: filter.hash_count() as u64,
        }
    }

    /// Rebuilds a filter from the snapshot. Exactly `1` is read as a set bit;
    /// every other integer is read as unset.
    pub fn decode(&self) -> Result<BloomFilter, BloomGuardError> {
        if self.bit_array_size == 0 {
            return Err(BloomGuardError::Decode(
                "bitArraySize must be at least 1".to_string(),
            ));
        }
        if self.bit_array.len() as u64 != self.bit_array_size {
            return Err(BloomGuardError::Decode(format!(
                "bitArray has {} entries but bitArraySize is {}",
                self.bit_array.len(),
                self.bit_array_size
            )));
        }
        let hash_count = u32::try_from(self.hash_function_count)
            .ok()
            .filter(|k| *k >= 1)
            .ok_or_else(|| {
                BloomGuardError::Decode(format!(
                    "hashFunctionCount {} is out of range",
                    self.hash_function_count
                ))
            })?;

        BloomFilter::from_bits(self.bit_array.iter().map(|&bit| bit == 1), hash_count)
            .ok_or_else(|| BloomGuardError::Decode("snapshot describes an empty filter".into()))
    }

    /// Parses a snapshot document without decoding it into a filter.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BloomGuardError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, BloomGuardError> {
        serde_json::to_vec(self).map_err(|e| BloomGuardError::Internal(e.to_string()))
    }
}

/// Writes the snapshot to `path`, replacing whatever was there.
///
/// Parent directories are created as needed. On failure the destination is
/// left untouched and the temporary file is removed.
pub async fn save(snapshot: &Snapshot, path: &Path) -> Result<(), BloomGuardError> {
    let bytes = snapshot.to_vec()?;
    replace_atomically(path, None, |temp_path| async move {
        write_and_sync(&temp_path, &bytes).await
    })
    .await
}

/// Like [`save`], but gives up with [`BloomGuardError::SaveTimeout`] if the
/// temporary file is not written and synced within `write_timeout`.
pub async fn save_with_timeout(
    snapshot: &Snapshot,
    path: &Path,
    write_timeout: Duration,
) -> Result<(), BloomGuardError> {
    let bytes = snapshot.to_vec()?;
    replace_atomically(path, Some(write_timeout), |temp_path| async move {
        write_and_sync(&temp_path, &bytes).await
    })
    .await
}

/// Replaces `path` with whatever `stage` writes to the temporary path it is
/// handed, by renaming the temporary file over `path` once `stage` succeeds.
///
/// `stage_timeout` bounds only the staging step. The rename is always awaited
/// to completion, so no replacement of `path` started here can land after
/// this function returns. A timed-out stage may still finish its in-flight
/// write on the blocking pool, but only ever to a temporary file that no
/// later call reuses.
pub async fn replace_atomically<F, Fut>(
    path: &Path,
    stage_timeout: Option<Duration>,
    stage: F,
) -> Result<(), BloomGuardError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<(), BloomGuardError>>,
{
    let temp_path = temp_path_for(path);
    let staging = async {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        stage(temp_path.clone()).await
    };

    let staged = match stage_timeout {
        Some(limit) => tokio::time::timeout(limit, staging)
            .await
            .unwrap_or(Err(BloomGuardError::SaveTimeout(limit))),
        None => staging.await,
    };
    if let Err(e) = staged {
        error!(
            "Failed to stage snapshot in temporary file '{}': {}",
            temp_path.display(),
            e
        );
        discard_temp_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        error!(
            "Failed to rename temporary snapshot '{}' to '{}': {}",
            temp_path.display(),
            path.display(),
            e
        );
        discard_temp_file(&temp_path).await;
        return Err(e.into());
    }

    debug!("Snapshot saved to {}", path.display());
    Ok(())
}

/// Reads and decodes the snapshot at `path`.
///
/// A missing file surfaces as [`BloomGuardError::Io`] with kind `NotFound`;
/// content that does not have the snapshot shape surfaces as
/// [`BloomGuardError::Decode`].
pub async fn load(path: &Path) -> Result<BloomFilter, BloomGuardError> {
    let bytes = fs::read(path).await?;
    debug!("Read snapshot ({} bytes) from {}", bytes.len(), path.display());
    Snapshot::from_slice(&bytes)?.decode()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".tmp.{}", rand::random::<u32>()));
    PathBuf::from(name)
}

async fn write_and_sync(path: &Path, bytes: &[u8]) -> Result<(), BloomGuardError> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

async fn discard_temp_file(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        error!(
            "Additionally failed to remove temporary snapshot file '{}': {}",
            path.display(),
            e
        );
    }
}
