// src/core/mod.rs

//! The central module containing the core logic and data structures of bloomguard.

pub mod errors;
pub mod metrics;
pub mod persistence;
pub mod state;
pub mod storage;

pub use errors::BloomGuardError;
pub use storage::BloomFilter;
