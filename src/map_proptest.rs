#![cfg(test)]

// Property tests for both map variants kept inside the crate so they can
// call the structural `check_invariants` helpers.

use crate::chaining_hash_map::ChainingHashMap;
use crate::open_addressing_hash_map::OpenAddressingHashMap;
use proptest::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup. Serialized as
// the bare string so `Key` and `str` land in the same bucket.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Rehash),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence of ChainingHashMap against
// std::collections::HashMap, for small initial capacities and thresholds so
// chains fill and rehash often.
// Invariants exercised after every operation:
// - set/get round-trip and update-in-place (len unchanged on update).
// - remove returns the model's value; removing an absent key is a no-op.
// - get is idempotent; iteration yields exactly the model's entries.
// - capacity never decreases; placement matches the current capacity;
//   chains never exceed the threshold; every node is reachable once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_chaining_state_machine(
        capacity in 1usize..=4,
        threshold in 1usize..=3,
        (pool, ops) in arb_scenario(),
    ) {
        let mut sut: ChainingHashMap<Key, i32> =
            ChainingHashMap::with_capacity_and_threshold(capacity, threshold).unwrap();
        let mut model: HashMap<Key, i32> = HashMap::new();
        let mut last_capacity = sut.capacity();

        for op in ops {
            match op {
                OpI::Set(i, v) => {
                    let k = key_from(&pool, i);
                    sut.set(k.clone(), v);
                    model.insert(k.clone(), v);
                    prop_assert_eq!(sut.get(&k), Some(&v));
                }
                OpI::Remove(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                    prop_assert!(sut.get(&k).is_none());
                }
                OpI::Get(i) => {
                    let k = key_from(&pool, i);
                    let first = sut.get(&k).copied();
                    prop_assert_eq!(first, model.get(&k).copied());
                    prop_assert_eq!(sut.get(&k).copied(), first);
                }
                OpI::Contains(s) => {
                    let has_model = model.keys().any(|k| k.0 == s);
                    prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
                }
                OpI::Mutate(i, d) => {
                    let k = key_from(&pool, i);
                    if let Some(vr) = sut.get_mut(&k) {
                        *vr = vr.saturating_add(d);
                        let mv = model.get_mut(&k).expect("present in model");
                        *mv = mv.saturating_add(d);
                    } else {
                        prop_assert!(!model.contains_key(&k));
                    }
                }
                // Bounded so long op lists do not allocate huge tables.
                OpI::Rehash if sut.capacity() < 1 << 10 => {
                    let before = sut.capacity();
                    sut.rehash();
                    prop_assert!(sut.capacity() >= before * 2);
                }
                OpI::Rehash => {}
                OpI::Iterate => {
                    let s: BTreeSet<(Key, i32)> =
                        sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    let m: BTreeSet<(Key, i32)> =
                        model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(s, m);
                }
            }

            prop_assert!(sut.capacity() >= last_capacity, "capacity shrank");
            last_capacity = sut.capacity();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            sut.check_invariants();
        }

        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
    }
}

// Property: the same state machine against OpenAddressingHashMap, which has
// no chains; `Rehash` is skipped since growth only happens on collision.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_open_addressing_state_machine(
        capacity in 1usize..=4,
        (pool, ops) in arb_scenario(),
    ) {
        let mut sut: OpenAddressingHashMap<Key, i32> =
            OpenAddressingHashMap::with_capacity(capacity).unwrap();
        let mut model: HashMap<Key, i32> = HashMap::new();
        let mut last_capacity = sut.capacity();

        for op in ops {
            match op {
                OpI::Set(i, v) => {
                    let k = key_from(&pool, i);
                    sut.set(k.clone(), v);
                    model.insert(k.clone(), v);
                    prop_assert_eq!(sut.get(&k), Some(&v));
                }
                OpI::Remove(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                    prop_assert!(sut.get(&k).is_none());
                }
                OpI::Get(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.get(&k).copied(), model.get(&k).copied());
                }
                OpI::Contains(s) => {
                    let has_model = model.keys().any(|k| k.0 == s);
                    prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
                }
                OpI::Mutate(i, d) => {
                    let k = key_from(&pool, i);
                    if let Some(vr) = sut.get_mut(&k) {
                        *vr = vr.saturating_add(d);
                        let mv = model.get_mut(&k).expect("present in model");
                        *mv = mv.saturating_add(d);
                    }
                }
                OpI::Rehash => {}
                OpI::Iterate => {
                    let s: BTreeSet<(Key, i32)> =
                        sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    let m: BTreeSet<(Key, i32)> =
                        model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(s, m);
                }
            }

            prop_assert!(sut.capacity() >= last_capacity, "capacity shrank");
            last_capacity = sut.capacity();
            prop_assert_eq!(sut.len(), model.len());
            sut.check_invariants();
        }
    }
}
