// src/core/storage/bloom.rs

use super::hash::{Murmur3Probe, ProbeHasher, SeedSchedule};
use super::params::FilterParams;

const WORD_BITS: u64 = u64::BITS as u64;

/// A Bloom filter implementation for probabilistic set membership testing.
///
/// Bits are packed into 64-bit words; logical bit `idx` lives in word
/// `idx / 64` at position `idx % 64`. The filter is add-only: bits move from
/// unset to set and never back.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter<H = Murmur3Probe> {
    words: Vec<u64>,
    size: u64,
    hash_count: u32,
    schedule: SeedSchedule,
    hasher: H,
}

impl BloomFilter<Murmur3Probe> {
    /// Creates an empty filter with the given dimensions, using MurmurHash3
    /// with one seed per probe index.
    pub fn new(params: FilterParams) -> Self {
        Self::with_hasher(params, Murmur3Probe, SeedSchedule::default())
    }

    /// Rebuilds a filter from its logical bit sequence. The filter's size is
    /// the length of `bits`.
    ///
    /// Returns `None` if `bits` is empty or `hash_count` is zero.
    pub fn from_bits<I>(bits: I, hash_count: u32) -> Option<Self>
    where
        I: ExactSizeIterator<Item = bool>,
    {
        let size = bits.len() as u64;
        if size == 0 || hash_count == 0 {
            return None;
        }
        let mut filter = Self::with_hasher(
            FilterParams { size, hash_count },
            Murmur3Probe,
            SeedSchedule::default(),
        );
        for (idx, bit) in bits.enumerate() {
            if bit {
                filter.set(idx as u64);
            }
        }
        Some(filter)
    }
}

impl<H: ProbeHasher> BloomFilter<H> {
    /// Creates an empty filter with an explicit hash strategy and seed schedule.
    ///
    /// `params.size` and `params.hash_count` must both be at least 1.
    pub fn with_hasher(params: FilterParams, hasher: H, schedule: SeedSchedule) -> Self {
        debug_assert!(params.size >= 1 && params.hash_count >= 1);
        let word_count = params.size.div_ceil(WORD_BITS) as usize;
        Self {
            words: vec![0; word_count],
            size: params.size,
            hash_count: params.hash_count,
            schedule,
            hasher,
        }
    }

    /// Adds an item to the filter. Returns true if a bit was flipped, false otherwise.
    pub fn add(&mut self, item: &[u8]) -> bool {
        let mut changed = false;
        for probe in 0..self.hash_count {
            let index = self.index_for(item, probe);
            changed |= self.set(index);
        }
        changed
    }

    /// Checks if an item is possibly in the set.
    /// Returns false if the item is definitely not in the set.
    /// Returns true if the item is *probably* in the set.
    pub fn check(&self, item: &[u8]) -> bool {
        (0..self.hash_count).all(|probe| self.get(self.index_for(item, probe)))
    }

    /// The bit index addressed by `probe` for `item`: `hash(item, seed) mod m`.
    pub fn index_for(&self, item: &[u8], probe: u32) -> u64 {
        let seed = self.schedule.seed_for(probe);
        self.hasher.probe(item, seed) % self.size
    }

    /// Returns the value of bit `index`. Indices outside `[0, size)` read as unset.
    pub fn get(&self, index: u64) -> bool {
        if index >= self.size {
            return false;
        }
        let word = self.words[(index / WORD_BITS) as usize];
        word & (1 << (index % WORD_BITS)) != 0
    }

    /// Sets bit `index`, returning true if it was previously unset.
    fn set(&mut self, index: u64) -> bool {
        let word = &mut self.words[(index / WORD_BITS) as usize];
        let mask = 1 << (index % WORD_BITS);
        let was_unset = *word & mask == 0;
        *word |= mask;
        was_unset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Iterates over every logical bit in index order.
    pub fn bits(&self) -> impl ExactSizeIterator<Item = bool> + '_ {
        (0..self.size as usize).map(move |idx| self.get(idx as u64))
    }

    /// The number of set bits.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// The fraction of bits that are set, in `[0, 1]`.
    pub fn fill_ratio(&self) -> f64 {
        self.count_ones() as f64 / self.size as f64
    }

    /// Estimates the current false-positive probability from the fill ratio.
    /// A random absent item is reported present only if all `k` probes land on set bits.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        self.fill_ratio().powi(self.hash_count as i32)
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.words.capacity() * std::mem::size_of::<u64>()
    }
}
