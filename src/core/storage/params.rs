// src/core/storage/params.rs

//! Derives Bloom filter dimensions from a target accuracy.
//!
//! The functions here are pure and perform no validation: callers are expected
//! to have already checked that `expected_elements >= 1` and that the
//! false-positive probability lies strictly inside `(0, 1)`.

use std::f64::consts::LN_2;

/// The largest filter that will be built: 2^32 bits, 512 MiB of packed words.
pub const MAX_FILTER_BITS: u64 = 1 << 32;

/// The dimensions of a Bloom filter: its bit count (`m`) and probe count (`k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub size: u64,
    pub hash_count: u32,
}

impl FilterParams {
    /// Computes `m` and `k` for `expected_elements` items at `false_positive_probability`.
    pub fn derive(expected_elements: u64, false_positive_probability: f64) -> Self {
        let size = optimal_size(expected_elements, false_positive_probability);
        let hash_count = optimal_hash_count(expected_elements, size);
        Self { size, hash_count }
    }
}

/// Calculates the number of bits: `m = ceil(-n * ln(p) / (ln 2)^2)`.
///
/// Rounds up so the realized false-positive rate never exceeds the target.
/// The result is floored at 1 so an engine can always be built from it.
pub fn optimal_size(expected_elements: u64, false_positive_probability: f64) -> u64 {
    (required_bits(expected_elements, false_positive_probability).ceil() as u64).max(1)
}

/// The unrounded bit count `-n * ln(p) / (ln 2)^2`.
///
/// Unlike [`optimal_size`] this does not saturate, so callers can reject
/// targets that no filter of at most [`MAX_FILTER_BITS`] bits can meet.
pub fn required_bits(expected_elements: u64, false_positive_probability: f64) -> f64 {
    -(expected_elements as f64 * false_positive_probability.ln()) / LN_2.powi(2)
}

/// Calculates the number of hash probes: `k = ceil((m / n) * ln 2)`.
pub fn optimal_hash_count(expected_elements: u64, size: u64) -> u32 {
    let k = (size as f64 / expected_elements as f64) * LN_2;
    (k.ceil() as u32).max(1)
}

/// Estimates the false-positive rate after `inserted` distinct items:
/// `(1 - e^(-k * n / m))^k`.
pub fn expected_false_positive_rate(size: u64, hash_count: u32, inserted: u64) -> f64 {
    if size == 0 {
        return 1.0;
    }
    let k = hash_count as f64;
    let exponent = -k * inserted as f64 / size as f64;
    (1.0 - exponent.exp()).powf(k)
}
