//! Digest-based bucket placement.
//!
//! A key is encoded with `serde_json`, the bytes are hashed with SHA-256,
//! the first eight digest bytes are read as a big-endian `i64`, and that
//! value is reduced modulo the capacity. A negative remainder is negated.
//!
//! The JSON encoding is canonical for strings, integers, tuples, sequences
//! and structs (fields are written in declaration order). Keys whose encoding
//! depends on iteration order, such as `std::collections::HashMap`, do not
//! hash deterministically and should not be used as map keys.

use crate::error::{Error, Result};
use hashbrown::HashSet;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Size in bytes of the digest every key is reduced from.
pub const DIGEST_LEN: usize = 32;

/// Serialize `key` and return its SHA-256 digest.
pub fn key_digest<Q>(key: &Q) -> Result<[u8; DIGEST_LEN]>
where
    Q: ?Sized + Serialize,
{
    let bytes = serde_json::to_vec(key)?;
    Ok(Sha256::digest(&bytes).into())
}

/// Interpret the leading eight bytes of a digest as a signed integer.
pub fn signed_prefix(digest: &[u8; DIGEST_LEN]) -> i64 {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}

/// Reduce a signed hash into `[0, capacity)`.
///
/// `capacity` must be non-zero and fit in an `i64`. The remainder of
/// `i64::MIN` is strictly greater than `-capacity`, so negating it never
/// overflows.
pub(crate) fn reduce(hash: i64, capacity: i64) -> usize {
    debug_assert!(capacity > 0);
    let r = hash % capacity;
    let r = if r < 0 { -r } else { r };
    r as usize
}

/// Bucket index of `key` in a table of `capacity` slots.
///
/// # Errors
/// `Error::Serialize` if the key cannot be encoded, `Error::CapacityOverflow`
/// if `capacity` is outside the signed 64-bit range, and `Error::ZeroCapacity`
/// for an empty table.
pub fn bucket_index<Q>(key: &Q, capacity: usize) -> Result<usize>
where
    Q: ?Sized + Serialize,
{
    let cap = signed_capacity(capacity)?;
    Ok(reduce(signed_prefix(&key_digest(key)?), cap))
}

fn signed_capacity(capacity: usize) -> Result<i64> {
    if capacity == 0 {
        return Err(Error::ZeroCapacity);
    }
    i64::try_from(capacity).map_err(|_| Error::CapacityOverflow { capacity })
}

/// Double `capacity`, failing if the result leaves the signed 64-bit range.
pub(crate) fn double_capacity(capacity: usize) -> Result<usize> {
    capacity
        .checked_mul(2)
        .filter(|c| i64::try_from(*c).is_ok())
        .ok_or(Error::CapacityOverflow { capacity })
}

/// Smallest capacity reached by doubling `capacity` (at least once) under
/// which every key in `keys` lands in its own bucket.
///
/// Returns the chosen capacity together with each key's bucket index, in the
/// order of `keys`. Each key is hashed to a digest once; only the reduction is
/// repeated per candidate capacity.
pub(crate) fn collision_free_capacity<Q>(
    capacity: usize,
    keys: &[&Q],
) -> Result<(usize, Vec<usize>)>
where
    Q: ?Sized + Serialize,
{
    let prefixes = keys
        .iter()
        .map(|k| key_digest(*k).map(|d| signed_prefix(&d)))
        .collect::<Result<Vec<i64>>>()?;

    let mut candidate = double_capacity(capacity)?;
    loop {
        // Pigeonhole: fewer buckets than keys always collides.
        if prefixes.len() <= candidate {
            let cap = signed_capacity(candidate)?;
            let indices: Vec<usize> = prefixes.iter().map(|&h| reduce(h, cap)).collect();
            let distinct: HashSet<usize> = indices.iter().copied().collect();
            if distinct.len() == indices.len() {
                return Ok((candidate, indices));
            }
        }
        log::trace!(
            "capacity {} still collides for {} keys, doubling",
            candidate,
            prefixes.len()
        );
        candidate = double_capacity(candidate)?;
    }
}
