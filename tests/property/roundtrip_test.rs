// tests/property/roundtrip_test.rs

//! Property-based tests for snapshot encoding
//! Tests that a filter survives encode/decode with identical behavior

use bloomguard::core::persistence::Snapshot;
use bloomguard::core::storage::BloomFilter;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_restored_filter_answers_identically(
        size in 1u64..600,
        hash_count in 1u32..12,
        added in prop::collection::vec("[a-z0-9]{1,12}", 0..40),
        probes in prop::collection::vec("[a-z0-9]{1,12}", 1..40)
    ) {
        let mut filter =
            BloomFilter::from_bits(vec![false; size as usize].into_iter(), hash_count).unwrap();
        for item in &added {
            filter.add(item.as_bytes());
        }

        let bytes = Snapshot::encode(&filter).to_vec().unwrap();
        let restored = Snapshot::from_slice(&bytes).unwrap().decode().unwrap();

        prop_assert_eq!(restored.size(), size);
        prop_assert_eq!(restored.hash_count(), hash_count);
        for item in added.iter().chain(&probes) {
            prop_assert_eq!(restored.check(item.as_bytes()), filter.check(item.as_bytes()));
        }
    }

    #[test]
    fn test_decode_reads_only_one_as_set(values in prop::collection::vec(-3i64..4, 1..200)) {
        let snapshot = Snapshot {
            bit_array_size: values.len() as u64,
            bit_array: values.clone(),
            hash_function_count: 3,
        };
        let filter = snapshot.decode().unwrap();
        for (idx, value) in values.iter().enumerate() {
            prop_assert_eq!(filter.get(idx as u64), *value == 1);
        }
        // Re-encoding normalizes every entry to 0 or 1.
        let normalized = Snapshot::encode(&filter);
        prop_assert!(normalized.bit_array.iter().all(|&b| b == 0 || b == 1));
    }
}
