//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check both strategies against a simple reference model.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{CacheType, CacheValue, FullTableCache, PartialTableCache, TableCache};

// == Strategies ==
/// Small key space so writes collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]".prop_map(|s| s)
}

/// Values with roughly one tombstone in five
fn value_strategy() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![4 => any::<u32>().prop_map(Some), 1 => Just(None)]
}

#[derive(Debug, Clone)]
struct Put {
    key: String,
    value: Option<u32>,
    epoch: i64,
}

fn put_strategy() -> impl Strategy<Value = Put> {
    (key_strategy(), value_strategy(), 0i64..100).prop_map(|(key, value, epoch)| Put {
        key,
        value,
        epoch,
    })
}

// == Reference Model ==
/// Last writer wins by epoch; on ties the first arrival stays.
fn expected_latest(puts: &[Put]) -> HashMap<String, CacheValue<u32>> {
    let mut model: HashMap<String, CacheValue<u32>> = HashMap::new();
    for put in puts {
        let newer = model
            .get(&put.key)
            .map_or(true, |current| put.epoch > current.epoch());
        if newer {
            model.insert(put.key.clone(), CacheValue::new(put.value, put.epoch));
        }
    }
    model
}

fn apply(cache: &dyn TableCache<String, u32>, puts: &[Put]) {
    for put in puts {
        cache.put(put.key.clone(), put.value, put.epoch);
    }
}

fn observe(cache: &dyn TableCache<String, u32>) -> Vec<Option<CacheValue<u32>>> {
    ["a", "b", "c", "d", "e"]
        .iter()
        .map(|k| cache.get(&k.to_string()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Every strategy answers reads with the highest-epoch write per key,
    // whatever order the writes arrived in.
    #[test]
    fn prop_highest_epoch_wins(puts in prop::collection::vec(put_strategy(), 1..60)) {
        let model = expected_latest(&puts);

        for cache_type in [CacheType::Full, CacheType::Partial] {
            let cache = cache_type.build::<String, u32>();
            apply(cache.as_ref(), &puts);

            prop_assert_eq!(cache.size(), model.len());
            for (key, expected) in &model {
                let cached = cache.get(key);
                prop_assert_eq!(cached.as_ref(), Some(expected));
            }
        }
    }

    // Partial cleanup drops exactly the keys whose newest write is at or
    // below the boundary; the full cache keeps everything.
    #[test]
    fn prop_cleanup_drops_only_subsumed_keys(
        puts in prop::collection::vec(put_strategy(), 1..60),
        boundary in 0i64..100
    ) {
        let model = expected_latest(&puts);

        let partial: PartialTableCache<String, u32> = PartialTableCache::new();
        let full: FullTableCache<String, u32> = FullTableCache::new();
        apply(&partial, &puts);
        apply(&full, &puts);

        partial.cleanup(boundary);
        full.cleanup(boundary);

        for (key, expected) in &model {
            if expected.epoch() <= boundary {
                prop_assert!(partial.get(key).is_none(), "{} should be evicted", key);
            } else {
                let kept = partial.get(key);
                prop_assert_eq!(kept.as_ref(), Some(expected));
            }
            let mirrored = full.get(key);
            prop_assert_eq!(mirrored.as_ref(), Some(expected));
        }

        let remaining = puts.iter().filter(|p| p.epoch > boundary).count();
        prop_assert_eq!(partial.pending_epochs(), remaining);
        prop_assert_eq!(full.size(), model.len());
    }

    // Running the same cleanup twice is the same as running it once.
    #[test]
    fn prop_cleanup_idempotent(
        puts in prop::collection::vec(put_strategy(), 1..60),
        boundary in 0i64..100
    ) {
        let cache: PartialTableCache<String, u32> = PartialTableCache::new();
        apply(&cache, &puts);

        cache.cleanup(boundary);
        let once = observe(&cache);
        let pending = cache.pending_epochs();

        cache.cleanup(boundary);
        prop_assert_eq!(observe(&cache), once);
        prop_assert_eq!(cache.pending_epochs(), pending);
    }

    // A cleanup behind an earlier boundary changes nothing.
    #[test]
    fn prop_regressing_cleanup_is_noop(
        puts in prop::collection::vec(put_strategy(), 1..60),
        first in 0i64..100,
        back in 1i64..50
    ) {
        let cache: PartialTableCache<String, u32> = PartialTableCache::new();
        apply(&cache, &puts);

        cache.cleanup(first);
        let before = observe(&cache);
        let pending = cache.pending_epochs();

        cache.cleanup(first - back);
        prop_assert_eq!(observe(&cache), before);
        prop_assert_eq!(cache.pending_epochs(), pending);
    }

    // Writes at or below a key's stored epoch never change what readers see.
    #[test]
    fn prop_stale_put_never_visible(
        key in key_strategy(),
        value in any::<u32>(),
        stale in value_strategy(),
        epoch in 1i64..100,
        lag in 0i64..10
    ) {
        for cache_type in [CacheType::Full, CacheType::Partial] {
            let cache = cache_type.build::<String, u32>();
            cache.put(key.clone(), Some(value), epoch);
            cache.put(key.clone(), stale, epoch - lag);

            let current = cache.get(&key).unwrap();
            prop_assert_eq!(current.value(), Some(&value));
            prop_assert_eq!(current.epoch(), epoch);
        }
    }
}
