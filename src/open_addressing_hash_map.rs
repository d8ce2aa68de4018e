//! OpenAddressingHashMap: one entry per slot, no chains. A collision with a
//! different key doubles the table until every key has a slot of its own.

use crate::config::MapConfig;
use crate::digest;
use crate::error::{fatal, Result};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use serde::Serialize;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// A key/value map with the same digest placement as
/// [`ChainingHashMap`](crate::ChainingHashMap), but without chains.
///
/// Every stored key occupies its own slot at all times, so lookups touch a
/// single slot. The price is growth: any insertion that lands on a slot held
/// by a different key doubles capacity until the stored keys plus the new one
/// are collision-free.
pub struct OpenAddressingHashMap<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    len: usize,
    reentrancy: DebugReentrancy,
}

impl<K, V> OpenAddressingHashMap<K, V> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate in slot order. The order changes whenever the table grows.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|e| (&e.key, &e.value))
    }
}

impl<K, V> OpenAddressingHashMap<K, V>
where
    K: Serialize + Eq,
{
    /// Empty map with capacity 4.
    pub fn new() -> Self {
        Self::from_config(MapConfig::default())
    }

    /// The config's rehash threshold is ignored.
    pub fn with_config(config: MapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(MapConfig::new().with_initial_capacity(capacity))
    }

    fn from_config(config: MapConfig) -> Self {
        let mut slots = Vec::with_capacity(config.initial_capacity);
        slots.resize_with(config.initial_capacity, || None);
        Self {
            slots,
            len: 0,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Slot index holding `q`, if any.
    fn find<Q>(&self, q: &Q) -> Result<Option<usize>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        let idx = digest::bucket_index(q, self.capacity())?;
        Ok(match &self.slots[idx] {
            Some(e) if e.key.borrow() == q => Some(idx),
            _ => None,
        })
    }

    pub fn try_get<Q>(&self, q: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        let _g = self.reentrancy.enter();
        Ok(self
            .find(q)?
            .and_then(|i| self.slots[i].as_ref())
            .map(|e| &e.value))
    }

    /// # Panics
    /// If `q` cannot be serialized.
    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        fatal(self.try_get(q))
    }

    pub fn try_get_mut<Q>(&mut self, q: &Q) -> Result<Option<&mut V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        let _g = self.reentrancy.enter();
        Ok(match self.find(q)? {
            Some(i) => self.slots[i].as_mut().map(|e| &mut e.value),
            None => None,
        })
    }

    /// # Panics
    /// If `q` cannot be serialized.
    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        fatal(self.try_get_mut(q))
    }

    pub fn try_contains_key<Q>(&self, q: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        self.try_get(q).map(|v| v.is_some())
    }

    /// # Panics
    /// If `q` cannot be serialized.
    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        fatal(self.try_contains_key(q))
    }

    /// Insert `key`, or overwrite its value if present.
    ///
    /// On error the map is left unchanged.
    pub fn try_set(&mut self, key: K, value: V) -> Result<()> {
        let _g = self.reentrancy.enter();
        let idx = digest::bucket_index(&key, self.capacity())?;
        match &mut self.slots[idx] {
            slot @ None => {
                *slot = Some(Entry { key, value });
                self.len += 1;
                return Ok(());
            }
            Some(e) if e.key == key => {
                e.value = value;
                return Ok(());
            }
            Some(_) => {}
        }
        grow(&mut self.slots, Entry { key, value })?;
        self.len += 1;
        Ok(())
    }

    /// # Panics
    /// If `key` cannot be serialized, or no collision-free capacity exists
    /// within the signed 64-bit range.
    pub fn set(&mut self, key: K, value: V) {
        fatal(self.try_set(key, value))
    }

    /// Remove `q` and return its value. A slot held by a different key is
    /// left alone.
    pub fn try_remove<Q>(&mut self, q: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        let _g = self.reentrancy.enter();
        let Some(idx) = self.find(q)? else {
            return Ok(None);
        };
        let removed = self.slots[idx].take().map(|e| e.value);
        self.len -= 1;
        Ok(removed)
    }

    /// # Panics
    /// If `q` cannot be serialized.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        fatal(self.try_remove(q))
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let cap = self.capacity();
        let mut occupied = 0;
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(e) = slot {
                assert_eq!(
                    digest::bucket_index(&e.key, cap).unwrap(),
                    idx,
                    "entry stored in a stale slot"
                );
                occupied += 1;
            }
        }
        assert_eq!(occupied, self.len);
    }
}

/// Double until the stored keys and `pending` are collision-free, then move
/// every entry to its new slot. On error `slots` is untouched.
fn grow<K, V>(slots: &mut Vec<Option<Entry<K, V>>>, pending: Entry<K, V>) -> Result<()>
where
    K: Serialize,
{
    let (capacity, indices) = {
        let mut keys: Vec<&K> = slots.iter().flatten().map(|e| &e.key).collect();
        keys.push(&pending.key);
        digest::collision_free_capacity(slots.len(), &keys)?
    };
    log::debug!(
        "grow: {} entries, capacity {} -> {}",
        indices.len(),
        slots.len(),
        capacity
    );

    let mut grown = Vec::with_capacity(capacity);
    grown.resize_with(capacity, || None);
    let entries = core::mem::take(slots)
        .into_iter()
        .flatten()
        .chain(Some(pending));
    for (entry, idx) in entries.zip(indices) {
        debug_assert!(grown[idx].is_none());
        grown[idx] = Some(entry);
    }
    *slots = grown;
    Ok(())
}

impl<K, V> Default for OpenAddressingHashMap<K, V>
where
    K: Serialize + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OpenAddressingHashMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Extend<(K, V)> for OpenAddressingHashMap<K, V>
where
    K: Serialize + Eq,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for OpenAddressingHashMap<K, V>
where
    K: Serialize + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::BTreeSet;

    /// Two distinct keys that share a slot at capacity 4.
    fn colliding_pair() -> (String, String) {
        let mut by_slot: Vec<Option<String>> = vec![None; 4];
        for i in 0.. {
            let k = format!("key{}", i);
            let idx = digest::bucket_index(&k, 4).unwrap();
            match &by_slot[idx] {
                Some(first) => return (first.clone(), k),
                None => by_slot[idx] = Some(k),
            }
        }
        unreachable!()
    }

    #[test]
    fn set_get_update_remove() {
        let mut m = OpenAddressingHashMap::new();
        m.set("a".to_string(), 1);
        m.set("a".to_string(), 2);
        assert_eq!(m.get("a"), Some(&2));
        assert_eq!(m.len(), 1);
        assert_eq!(m.remove("a"), Some(2));
        assert_eq!(m.get("a"), None);
        assert!(m.is_empty());
    }

    /// Invariant: a collision grows the table instead of chaining.
    #[test]
    fn collision_grows_capacity() {
        let (a, b) = colliding_pair();
        let mut m = OpenAddressingHashMap::new();
        m.set(a.clone(), 1);
        assert_eq!(m.capacity(), 4);
        m.set(b.clone(), 2);
        assert!(m.capacity() >= 8 && m.capacity().is_power_of_two());
        assert_eq!(m.get(&a), Some(&1));
        assert_eq!(m.get(&b), Some(&2));
        assert_eq!(m.len(), 2);
        m.check_invariants();
    }

    /// Invariant: a lookup or removal that lands on a slot held by another
    /// key reports absence and leaves the occupant in place.
    #[test]
    fn occupied_slot_with_other_key_is_not_a_match() {
        let (a, b) = colliding_pair();
        let mut m = OpenAddressingHashMap::new();
        m.set(a.clone(), 1);
        assert_eq!(m.get(&b), None);
        assert!(!m.contains_key(&b));
        assert_eq!(m.remove(&b), None);
        assert_eq!(m.get(&a), Some(&1));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn many_keys_stay_addressable() {
        let m: OpenAddressingHashMap<u32, u32> = (0..40).map(|i| (i, i * i)).collect();
        for i in 0..40 {
            assert_eq!(m.get(&i), Some(&(i * i)));
        }
        assert_eq!(m.len(), 40);
        let keys: BTreeSet<u32> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..40).collect());
        m.check_invariants();
    }

    #[test]
    fn get_mut_and_debug() {
        let mut m = OpenAddressingHashMap::new();
        m.set("k".to_string(), 1);
        *m.get_mut("k").unwrap() = 9;
        assert_eq!(format!("{:?}", m), r#"{"k": 9}"#);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            OpenAddressingHashMap::<String, i32>::with_capacity(0),
            Err(Error::ZeroCapacity)
        ));
    }
}
