//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's bookkeeping over arbitrary operation
//! sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{CacheStats, CacheStore};
use crate::clone::deep_clone;
use crate::config::Config;
use crate::value::Value;

// == Strategies ==
/// Generates valid string keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates values of the shapes the size heuristic distinguishes
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::new_array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(Value::new_object),
        ]
    })
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    Take { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Take { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits and misses count lookups; keys tracks the stored entry count.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new(Config::default());
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(&key, value, None).unwrap();
                }
                CacheOp::Get { key } => {
                    match store.get(&key).unwrap() {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    store.del(&key).unwrap();
                }
                CacheOp::Take { key } => {
                    match store.take(&key).unwrap() {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.keys, store.len() as i64, "Key count mismatch");
    }

    // Deleting every stored key restores ksize and vsize exactly.
    #[test]
    fn prop_size_accounting_round_trip(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 1..40)
    ) {
        let mut store = CacheStore::new(Config::default());

        for (key, value) in &entries {
            store.set(key, value.clone(), None).unwrap();
        }
        let keys: Vec<String> = entries
            .iter()
            .map(|(key, _)| key.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(store.stats().keys, keys.len() as i64);

        prop_assert_eq!(store.del_many(&keys).unwrap(), keys.len());
        let stats = store.stats();
        prop_assert_eq!((stats.keys, stats.ksize, stats.vsize), (0, 0, 0));
    }

    // Stored values come back structurally equal.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in value_strategy()) {
        let mut store = CacheStore::new(Config::default());

        store.set(&key, value.clone(), None).unwrap();

        let retrieved = store.get(&key).unwrap();
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // A deep clone is structurally equal to its source.
    #[test]
    fn prop_clone_preserves_structure(value in value_strategy()) {
        let copy = deep_clone(&value);
        prop_assert!(copy.deep_eq(&value));
    }

    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let mut store = CacheStore::new(Config::default());

        store.set(&key, value1, None).unwrap();
        let after_first = store.stats();
        store.set(&key, value2.clone(), None).unwrap();

        prop_assert_eq!(store.get(&key).unwrap(), Some(value2.clone()));
        prop_assert_eq!(store.len(), 1, "Should have exactly one entry after overwrite");
        prop_assert_eq!(store.stats().keys, after_first.keys);
        prop_assert_eq!(store.stats().vsize, store.value_size(&value2));
    }

    // With a key cap, the store never holds more than max_keys entries.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 1..200)
    ) {
        let max_keys = 50;
        let mut store = CacheStore::new(Config::default().with_max_keys(max_keys));

        for (key, value) in entries {
            let _ = store.set(&key, value, None);
            prop_assert!(
                store.len() as i64 <= max_keys,
                "Cache size {} exceeds max {}",
                store.len(),
                max_keys
            );
        }
    }

    #[test]
    fn prop_flush_all_resets(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 0..20)
    ) {
        let mut store = CacheStore::new(Config::default());
        for (key, value) in entries {
            store.set(&key, value, None).unwrap();
        }
        store.flush_all();

        prop_assert!(store.is_empty());
        prop_assert_eq!(store.stats(), CacheStats::new());
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in value_strategy()
    ) {
        let mut store = CacheStore::new(Config::default());

        store.set(&key, value.clone(), Some(0.2)).unwrap();

        prop_assert_eq!(store.get(&key).unwrap(), Some(value), "Value should match before expiration");

        sleep(Duration::from_millis(300));

        prop_assert_eq!(store.get(&key).unwrap(), None, "Entry should not be found after TTL expires");
        prop_assert_eq!(store.stats().keys, 0);
    }
}
