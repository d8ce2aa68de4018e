//! ChainingHashMap: digest-placed buckets with singly-linked chains and a
//! threshold-triggered, collision-free rehash.

use crate::config::MapConfig;
use crate::digest;
use crate::error::{fatal, Result};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use serde::Serialize;
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    next: Option<DefaultKey>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Self {
        Node {
            key,
            value,
            next: None,
        }
    }
}

/// Bucket heads plus the node arena. Each bucket owns the first node of its
/// chain and each node owns its successor; every live node is reachable from
/// exactly one bucket.
struct Table<K, V> {
    buckets: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
}

impl<K, V> Table<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Table {
            buckets: vec![None; capacity],
            nodes: SlotMap::with_key(),
        }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn index_of<Q>(&self, q: &Q) -> Result<usize>
    where
        Q: ?Sized + Serialize,
    {
        digest::bucket_index(q, self.capacity())
    }

    fn find<Q>(&self, idx: usize, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self.buckets[idx];
        while let Some(n) = cur {
            let node = &self.nodes[n];
            if node.key.borrow() == q {
                return Some(n);
            }
            cur = node.next;
        }
        None
    }

    fn chains(&self) -> Chains<'_, K, V> {
        Chains {
            table: self,
            bucket: 0,
            cur: None,
        }
    }

    /// Append `node` to the end of the chain at `idx`.
    fn link_tail(&mut self, idx: usize, node: DefaultKey) {
        self.nodes[node].next = None;
        match self.buckets[idx] {
            None => self.buckets[idx] = Some(node),
            Some(mut cur) => {
                while let Some(next) = self.nodes[cur].next {
                    cur = next;
                }
                self.nodes[cur].next = Some(node);
            }
        }
    }

    /// Splice the node matching `q` out of the chain at `idx`.
    fn unlink<Q>(&mut self, idx: usize, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let head = self.buckets[idx]?;
        if self.nodes[head].key.borrow() == q {
            self.buckets[idx] = self.nodes[head].next;
            return self.nodes.remove(head).map(|n| n.value);
        }
        let mut prev = head;
        while let Some(cur) = self.nodes[prev].next {
            if self.nodes[cur].key.borrow() == q {
                self.nodes[prev].next = self.nodes[cur].next;
                return self.nodes.remove(cur).map(|n| n.value);
            }
            prev = cur;
        }
        None
    }

    /// Grow to a capacity under which the stored keys, plus `pending` if
    /// given, are pairwise collision-free, then relink every node.
    ///
    /// Nodes are relinked in bucket-then-chain order with `pending` last.
    /// The capacity search runs before anything is touched, so an error
    /// leaves the table unchanged and drops `pending`.
    fn rebuild(&mut self, pending: Option<(K, V)>) -> Result<()>
    where
        K: Serialize,
    {
        let mut order: Vec<DefaultKey> = self.chains().map(|(n, _)| n).collect();
        let (capacity, indices) = {
            let mut keys: Vec<&K> = order.iter().map(|&n| &self.nodes[n].key).collect();
            if let Some((k, _)) = &pending {
                keys.push(k);
            }
            digest::collision_free_capacity(self.capacity(), &keys)?
        };
        log::debug!(
            "rehash: {} entries, capacity {} -> {}",
            indices.len(),
            self.capacity(),
            capacity
        );
        let entries = indices.len();

        if let Some((key, value)) = pending {
            order.push(self.nodes.insert(Node::new(key, value)));
        }
        self.buckets = vec![None; capacity];
        for (node, idx) in order.into_iter().zip(indices) {
            self.link_tail(idx, node);
        }
        log::debug!("rehash committed: {} entries in {} buckets", entries, capacity);
        Ok(())
    }
}

/// Walks every node in bucket order, then chain order.
struct Chains<'a, K, V> {
    table: &'a Table<K, V>,
    bucket: usize,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chains<'a, K, V> {
    type Item = (DefaultKey, &'a Node<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        loop {
            if let Some(n) = self.cur {
                let node = &table.nodes[n];
                self.cur = node.next;
                return Some((n, node));
            }
            let head = table.buckets.get(self.bucket)?;
            self.bucket += 1;
            self.cur = *head;
        }
    }
}

/// A key/value map that places keys by the SHA-256 digest of their JSON
/// encoding and resolves collisions by chaining.
///
/// Inserting a new key into a chain that already holds `rehash_threshold`
/// nodes rebuilds the whole table at a capacity under which no two stored
/// keys share a bucket. Capacity only ever doubles; it never shrinks.
///
/// Keys must serialize identically whenever they compare equal. Lookups by a
/// borrowed form `Q` additionally require `Q` to serialize the same way as
/// the owning `K` (`String` and `str` do).
pub struct ChainingHashMap<K, V> {
    table: Table<K, V>,
    rehash_threshold: usize,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainingHashMap<K, V> {
    pub fn len(&self) -> usize {
        self.table.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.nodes.is_empty()
    }

    /// Current number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn rehash_threshold(&self) -> usize {
        self.rehash_threshold
    }

    /// Iterate over all entries. The order is unspecified and changes on rehash.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            chains: self.table.chains(),
            remaining: self.len(),
        }
    }
}

impl<K, V> ChainingHashMap<K, V>
where
    K: Serialize + Eq,
{
    /// Empty map with capacity 4 and rehash threshold 2.
    pub fn new() -> Self {
        Self::from_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    pub fn with_capacity_and_threshold(capacity: usize, rehash_threshold: usize) -> Result<Self> {
        Self::with_config(
            MapConfig::new()
                .with_initial_capacity(capacity)
                .with_rehash_threshold(rehash_threshold),
        )
    }

    fn from_config(config: MapConfig) -> Self {
        Self {
            table: Table::with_capacity(config.initial_capacity),
            rehash_threshold: config.rehash_threshold,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn try_get<Q>(&self, q: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        let _g = self.reentrancy.enter();
        let idx = self.table.index_of(q)?;
        Ok(self.table.find(idx, q).map(|n| &self.table.nodes[n].value))
    }

    /// Look up the value stored under `q`.
    ///
    /// # Panics
    /// If `q` cannot be serialized. See [`try_get`](Self::try_get).
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
        let idx = self.table.index_of(q)?;
        Ok(match self.table.find(idx, q) {
            Some(n) => Some(&mut self.table.nodes[n].value),
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

    /// Insert `key`, or overwrite its value in place if already present.
    ///
    /// The chain at the key's bucket is walked head to tail. A matching node
    /// is updated without moving it. Otherwise the new node is appended,
    /// unless the walk visited `rehash_threshold` nodes, in which case the
    /// whole table is rebuilt with the new entry included.
    ///
    /// On error the map is left unchanged.
    pub fn try_set(&mut self, key: K, value: V) -> Result<()> {
        let _g = self.reentrancy.enter();
        let table = &mut self.table;
        let idx = table.index_of(&key)?;
        let Some(head) = table.buckets[idx] else {
            let node = table.nodes.insert(Node::new(key, value));
            table.buckets[idx] = Some(node);
            return Ok(());
        };

        let mut visited = 0;
        let mut tail = head;
        loop {
            visited += 1;
            let node = &mut table.nodes[tail];
            if node.key == key {
                node.value = value;
                return Ok(());
            }
            match node.next {
                Some(next) => tail = next,
                None => break,
            }
        }

        if visited >= self.rehash_threshold {
            return table.rebuild(Some((key, value)));
        }
        let node = table.nodes.insert(Node::new(key, value));
        table.nodes[tail].next = Some(node);
        Ok(())
    }

    /// # Panics
    /// If `key` cannot be serialized, or if the rehash it triggers cannot
    /// find a capacity within the signed 64-bit range.
    pub fn set(&mut self, key: K, value: V) {
        fatal(self.try_set(key, value))
    }

    /// Remove `q` and return its value. Removing an absent key is a no-op.
    pub fn try_remove<Q>(&mut self, q: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Serialize + Eq,
    {
        let _g = self.reentrancy.enter();
        let idx = self.table.index_of(q)?;
        Ok(self.table.unlink(idx, q))
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

    /// Rebuild the table at the next capacity, at least double the current
    /// one, under which no two stored keys collide.
    pub fn try_rehash(&mut self) -> Result<()> {
        let _g = self.reentrancy.enter();
        self.table.rebuild(None)
    }

    /// # Panics
    /// If no such capacity exists within the signed 64-bit range.
    pub fn rehash(&mut self) {
        fatal(self.try_rehash())
    }

    /// Assert the structural invariants: placement matches the current
    /// capacity, keys are unique, chains respect the threshold and every node
    /// is reachable exactly once.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let cap = self.capacity();
        let mut reachable = 0;
        for idx in 0..cap {
            let mut chain_len = 0;
            let mut cur = self.table.buckets[idx];
            while let Some(n) = cur {
                let node = &self.table.nodes[n];
                assert_eq!(
                    digest::bucket_index(&node.key, cap).unwrap(),
                    idx,
                    "node stored under a stale bucket"
                );
                assert_eq!(self.table.find(idx, &node.key), Some(n), "duplicate key");
                chain_len += 1;
                cur = node.next;
            }
            assert!(
                chain_len <= self.rehash_threshold,
                "chain of {} exceeds threshold {}",
                chain_len,
                self.rehash_threshold
            );
            reachable += chain_len;
        }
        assert_eq!(reachable, self.len(), "unreachable or shared nodes");
    }
}

impl<K, V> Default for ChainingHashMap<K, V>
where
    K: Serialize + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ChainingHashMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Extend<(K, V)> for ChainingHashMap<K, V>
where
    K: Serialize + Eq,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ChainingHashMap<K, V>
where
    K: Serialize + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

/// Iterator over the entries of a `ChainingHashMap`.
pub struct Iter<'a, K, V> {
    chains: Chains<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (_, node) = self.chains.next()?;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a ChainingHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
