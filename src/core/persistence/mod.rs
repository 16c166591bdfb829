// src/core/persistence/mod.rs

//! This module contains all logic related to persisting the Bloom filter:
//! the snapshot format and the functions that save it to and load it from disk.

pub mod snapshot;

pub use snapshot::Snapshot;
