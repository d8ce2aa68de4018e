//! digest-hashmap: single-threaded key/value maps that place keys by the
//! SHA-256 digest of their serialized form.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a generic map whose bucket placement is a pure function of the
//!   key's canonical bytes and the current capacity, with a rehash that
//!   guarantees no two stored keys collide at the new capacity.
//! - Layers:
//!   - `digest`: key -> JSON bytes -> SHA-256 -> signed 64-bit prefix ->
//!     index in `[0, capacity)`; plus the doubling search for a
//!     collision-free capacity.
//!   - `ChainingHashMap<K, V>`: buckets of singly-linked chains stored in a
//!     slot arena; a chain that reaches the rehash threshold triggers a full
//!     rebuild.
//!   - `OpenAddressingHashMap<K, V>`: one entry per slot; any collision with
//!     a different key triggers the same rebuild.
//!
//! Constraints
//! - Single-threaded: no internal synchronization. Maps are `Send` but never
//!   `Sync`, so callers that share a map must put it behind one lock.
//! - Keys need `Serialize + Eq`, and equal keys must serialize to equal
//!   bytes. Hashing never calls `std::hash::Hash`.
//! - Capacity only grows. Removing entries never shrinks the table.
//!
//! Chains
//! - Nodes live in a `SlotMap`; bucket heads and `next` links are slot keys.
//!   Each live node is reachable from exactly one bucket, so unlinking is a
//!   pointer splice followed by `SlotMap::remove`.
//! - Chain order is insertion order. Updating a value never moves its node.
//!
//! Rehash
//! - Snapshot every node in bucket-then-chain order, hash each key once,
//!   and double capacity (at least once) until the reduced indices are
//!   pairwise distinct, deduplicating with a `hashbrown::HashSet`.
//! - Relink the snapshot into a fresh bucket table with plain placement.
//!   Nothing re-enters `set`, so there is no shared visit counter.
//! - The search completes before anything is mutated: an error leaves the
//!   map untouched.
//!
//! Errors
//! - Serialization failure and capacity overflow are the only errors. The
//!   `try_*` methods return them; the plain methods panic, since neither
//!   error can be cured by retrying.
//!
//! Reentrancy
//! - User code runs during hashing (`Serialize`) and comparison (`Eq`).
//!   A debug-only guard panics if that code calls back into the same map.

pub mod chaining_hash_map;
pub mod config;
pub mod digest;
mod error;
mod map_proptest;
pub mod open_addressing_hash_map;
mod reentrancy;

// Public surface
pub use chaining_hash_map::ChainingHashMap;
pub use config::MapConfig;
pub use error::{Error, Result};
pub use open_addressing_hash_map::OpenAddressingHashMap;
