// src/core/storage/hash.rs

//! The hash family used to address bits in the Bloom filter.
//!
//! Rather than `k` distinct algorithms, one 64-bit hash is applied `k` times
//! with a different seed per probe. The seed for each probe comes from a
//! [`SeedSchedule`], so the strategy and the seeding can be swapped or tested
//! independently of the filter.

use murmur3::murmur3_x64_128;
use std::io::Cursor;

/// A deterministic, seeded 64-bit hash over raw bytes.
///
/// Implementations must return the same value for the same `(item, seed)` pair
/// across calls, processes and platforms, otherwise a reloaded snapshot would
/// address different bits than the ones that were set.
pub trait ProbeHasher: Send + Sync {
    fn probe(&self, item: &[u8], seed: u32) -> u64;
}

/// MurmurHash3 (x64, 128-bit variant) keyed by the probe seed, truncated to
/// its low 64 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Murmur3Probe;

impl ProbeHasher for Murmur3Probe {
    fn probe(&self, item: &[u8], seed: u32) -> u64 {
        // Reading from an in-memory slice never yields an I/O error.
        let hash128 = murmur3_x64_128(&mut Cursor::new(item), seed)
            .expect("hashing an in-memory buffer cannot fail");
        hash128 as u64
    }
}

/// Maps a probe index `i` in `[0, k)` to the seed passed to the hasher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeedSchedule {
    /// `seed = i`. This is the schedule persisted snapshots were written with.
    #[default]
    ProbeIndex,
    /// `seed = base + i`, wrapping.
    Offset(u32),
}

impl SeedSchedule {
    pub fn seed_for(&self, probe: u32) -> u32 {
        match self {
            SeedSchedule::ProbeIndex => probe,
            SeedSchedule::Offset(base) => base.wrapping_add(probe),
        }
    }
}
