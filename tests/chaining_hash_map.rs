// ChainingHashMap integration tests against the public API.
//
// Each test documents the behavior verified:
// - Round-trip and update-in-place of set/get.
// - Removal and no-op removal of absent keys.
// - Rehash preserves contents; capacity never decreases.
// - The reference demonstration scenario.
use digest_hashmap::{digest, ChainingHashMap, Error, MapConfig};

const DEMO: [(&str, i32); 8] = [
    ("sdf", 1),
    ("asdf", 2),
    ("asdfs", 3),
    ("asd2342342f", 4),
    ("sdf2222222", 5),
    ("asdf2222222", 6),
    ("asdfs2222222", 7),
    ("asd2342342f2222222", 8),
];

// Test: the reference demonstration with capacity 4 and threshold 2.
// Verifies: every key reads back the last value set; capacity is a power
// of two no smaller than the initial one.
#[test]
fn reference_demo_scenario() {
    let mut m = ChainingHashMap::with_capacity_and_threshold(4, 2).unwrap();
    let mut caps = vec![m.capacity()];
    for (k, v) in DEMO {
        m.set(k.to_string(), v);
        caps.push(m.capacity());
    }
    for (k, v) in DEMO {
        assert_eq!(m.get(k), Some(&v), "key {}", k);
    }
    assert_eq!(m.get("non-existent"), None);
    assert_eq!(m.len(), 8);
    assert!(m.capacity().is_power_of_two());
    assert!(caps.windows(2).all(|w| w[0] <= w[1]), "capacity shrank: {:?}", caps);
}

// Test: update-in-place.
// Verifies: the second set wins and len is unchanged.
#[test]
fn update_overwrites_without_growing_len() {
    let mut m = ChainingHashMap::new();
    for (k, v) in DEMO {
        m.set(k.to_string(), v);
    }
    let len = m.len();
    m.set("asdfs".to_string(), 300);
    assert_eq!(m.get("asdfs"), Some(&300));
    assert_eq!(m.len(), len);
}

// Test: removal and no-op removal.
// Verifies: removed keys read absent; other keys are untouched; removing an
// absent key changes nothing.
#[test]
fn remove_and_remove_absent() {
    let mut m: ChainingHashMap<String, i32> =
        DEMO.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    assert_eq!(m.remove("asdf"), Some(2));
    assert_eq!(m.get("asdf"), None);
    assert_eq!(m.remove("asdf"), None);
    assert_eq!(m.remove("never-inserted"), None);
    assert_eq!(m.len(), 7);
    for (k, v) in DEMO.iter().filter(|(k, _)| *k != "asdf") {
        assert_eq!(m.get(*k), Some(v));
    }
}

// Test: forcing rehash by packing a single bucket.
// Assumes: capacity 1 puts every key in one chain.
// Verifies: the insert that finds a full chain rehashes; afterwards every
// key sits alone in its bucket and reads back correctly.
#[test]
fn rehash_preserves_contents_and_separates_keys() {
    let mut m = ChainingHashMap::with_capacity_and_threshold(1, 3).unwrap();
    for i in 0..3 {
        m.set(format!("k{}", i), i);
    }
    assert_eq!(m.capacity(), 1);
    m.set("k3".to_string(), 3);
    assert!(m.capacity() >= 4);

    let cap = m.capacity();
    let mut buckets: Vec<usize> = (0..4)
        .map(|i| digest::bucket_index(&format!("k{}", i), cap).unwrap())
        .collect();
    buckets.sort_unstable();
    buckets.dedup();
    assert_eq!(buckets.len(), 4);
    for i in 0..4 {
        assert_eq!(m.get(&format!("k{}", i)), Some(&i));
    }
}

// Test: many keys, many rehashes.
// Verifies: contents survive repeated growth and removals interleaved.
#[test]
fn bulk_insert_and_remove() {
    let mut m = ChainingHashMap::new();
    for i in 0u32..300 {
        m.set(i, i.wrapping_mul(2654435761));
    }
    for i in (0u32..300).step_by(3) {
        assert_eq!(m.remove(&i), Some(i.wrapping_mul(2654435761)));
    }
    for i in 0u32..300 {
        let expected = (i % 3 != 0).then(|| i.wrapping_mul(2654435761));
        assert_eq!(m.get(&i).copied(), expected);
    }
    assert_eq!(m.len(), 200);
    assert_eq!(m.iter().count(), 200);
}

// Test: configuration plumbing.
// Verifies: a config loaded from JSON builds a map with those parameters;
// invalid configs are rejected with the matching error.
#[test]
fn built_from_json_config() {
    let cfg: MapConfig =
        serde_json::from_str(r#"{"initial_capacity": 16, "rehash_threshold": 4}"#).unwrap();
    let m: ChainingHashMap<String, u8> = ChainingHashMap::with_config(cfg).unwrap();
    assert_eq!(m.capacity(), 16);
    assert_eq!(m.rehash_threshold(), 4);

    let bad = MapConfig::new().with_rehash_threshold(0);
    assert!(matches!(
        ChainingHashMap::<String, u8>::with_config(bad),
        Err(Error::ZeroThreshold)
    ));
}

// Test: fallible surface.
// Verifies: try_* mirror the plain methods for well-formed keys.
#[test]
fn try_methods_mirror_plain_ones() {
    let mut m = ChainingHashMap::new();
    m.try_set("a".to_string(), 1).unwrap();
    assert_eq!(m.try_get("a").unwrap(), Some(&1));
    assert!(m.try_contains_key("a").unwrap());
    *m.try_get_mut("a").unwrap().unwrap() = 5;
    assert_eq!(m.try_remove("a").unwrap(), Some(5));
    assert!(!m.try_contains_key("a").unwrap());
    m.try_rehash().unwrap();
    assert_eq!(m.capacity(), 8);
}
