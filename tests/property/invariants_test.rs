// tests/property/invariants_test.rs

//! Property-based tests for the filter's core guarantees
//! Tests: no false negatives, add-only bits, idempotence, sizing

use bloomguard::core::storage::params::{optimal_hash_count, optimal_size};
use bloomguard::core::storage::{BloomFilter, FilterParams};
use proptest::prelude::*;

fn arb_params() -> impl Strategy<Value = FilterParams> {
    (1u64..=2_000, 0.0001f64..0.5).prop_map(|(n, p)| FilterParams::derive(n, p))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_no_false_negatives(
        params in arb_params(),
        items in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..100)
    ) {
        let mut filter = BloomFilter::new(params);
        for item in &items {
            filter.add(item);
        }
        for item in &items {
            prop_assert!(filter.check(item));
        }
    }

    #[test]
    fn test_bits_never_clear(
        params in arb_params(),
        items in prop::collection::vec("[ -~]{0,32}", 1..50)
    ) {
        let mut filter = BloomFilter::new(params);
        let mut ones = 0;
        for item in &items {
            let before: Vec<bool> = filter.bits().collect();
            filter.add(item.as_bytes());
            for (idx, was_set) in before.into_iter().enumerate() {
                prop_assert!(!was_set || filter.get(idx as u64));
            }
            let now = filter.count_ones();
            prop_assert!(now >= ones);
            ones = now;
        }
    }

    #[test]
    fn test_readd_changes_nothing(params in arb_params(), item in ".{0,64}") {
        let mut filter = BloomFilter::new(params);
        filter.add(item.as_bytes());
        let snapshot = filter.clone();
        prop_assert!(!filter.add(item.as_bytes()));
        prop_assert_eq!(filter, snapshot);
    }

    #[test]
    fn test_newly_added_matches_prior_check(
        params in arb_params(),
        items in prop::collection::vec(".{0,16}", 1..40)
    ) {
        let mut filter = BloomFilter::new(params);
        for item in &items {
            let was_present = filter.check(item.as_bytes());
            let flipped = filter.add(item.as_bytes());
            prop_assert_eq!(flipped, !was_present);
        }
    }

    #[test]
    fn test_derived_dimensions_are_usable(n in 1u64..1_000_000, p in 1e-9f64..0.999) {
        let params = FilterParams::derive(n, p);
        prop_assert!(params.size >= 1);
        prop_assert!(params.hash_count >= 1);
        prop_assert_eq!(params.size, optimal_size(n, p));
        prop_assert_eq!(params.hash_count, optimal_hash_count(n, params.size));
    }

    #[test]
    fn test_smaller_probability_never_shrinks_filter(
        n in 1u64..100_000,
        p in 0.001f64..0.5,
        factor in 0.1f64..0.9
    ) {
        prop_assert!(optimal_size(n, p * factor) >= optimal_size(n, p));
    }
}
