use proptest::prelude::*;
use serde_json::{Map, Value};
use sitebook_cache::{QueryKey, RetryPolicy};
use std::time::Duration;

fn object_from(pairs: &[(String, u32)]) -> Value {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert(k.clone(), Value::from(*v));
    }
    Value::Object(map)
}

proptest! {
    // Field insertion order never changes the key.
    #[test]
    fn key_ignores_field_order(
        pairs in proptest::collection::btree_map("[a-z_]{1,8}", 0u32..1000, 0..6)
    ) {
        let forward: Vec<(String, u32)> = pairs.clone().into_iter().collect();
        let backward: Vec<(String, u32)> = forward.iter().rev().cloned().collect();

        let a = QueryKey::new("reports").with(object_from(&forward));
        let b = QueryKey::new("reports").with(object_from(&backward));
        prop_assert_eq!(a.encoded(), b.encoded());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn key_is_prefixed_by_its_resource(resource in "[a-z-]{1,16}", id in 0i64..100_000) {
        let key = QueryKey::new(&resource).with(id);
        prop_assert!(key.starts_with(&QueryKey::new(&resource)));
        prop_assert_eq!(key.resource(), resource.as_str());
    }

    #[test]
    fn sibling_ids_never_match(resource in "[a-z-]{1,16}", a in 0i64..1000, b in 0i64..1000) {
        prop_assume!(a != b);
        let left = QueryKey::new(&resource).with(a);
        let right = QueryKey::new(&resource).with(b);
        prop_assert!(!left.starts_with(&right));
    }

    // Delays never decrease and never pass the cap.
    #[test]
    fn retry_schedule_is_monotonic_and_capped(
        retries in 0u32..12,
        base_ms in 1u64..5_000,
        cap_ms in 1u64..60_000,
    ) {
        let policy = RetryPolicy {
            max_retries: retries,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(cap_ms),
        };
        let schedule = policy.schedule();
        prop_assert_eq!(schedule.len(), retries as usize);
        for pair in schedule.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        for delay in &schedule {
            prop_assert!(*delay <= Duration::from_millis(cap_ms));
        }
    }
}
