// src/core/storage/mod.rs

pub mod bloom;
pub mod hash;
pub mod params;

pub use bloom::BloomFilter;
pub use hash::{Murmur3Probe, ProbeHasher, SeedSchedule};
pub use params::FilterParams;
