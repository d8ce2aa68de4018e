//! Error taxonomy shared by both map variants.

use thiserror::Error;

/// Errors raised while hashing keys, growing the table or building a map.
///
/// None of these are meant to be retried: a key that fails to serialize will
/// fail again, and an overflowing capacity cannot be recovered by waiting.
#[derive(Error, Debug)]
pub enum Error {
    #[error("key could not be serialized for hashing: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("capacity {capacity} cannot be doubled without overflowing the hash range")]
    CapacityOverflow { capacity: usize },

    #[error("map capacity must be at least 1")]
    ZeroCapacity,

    #[error("rehash threshold must be at least 1")]
    ZeroThreshold,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Unwrap the outcome of a hashing operation for the panicking API surface.
#[track_caller]
pub(crate) fn fatal<T>(res: Result<T>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => panic!("digest-hashmap: {}", e),
    }
}
