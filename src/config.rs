//! Construction parameters for the map variants.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bucket count a fresh map starts with.
pub const DEFAULT_CAPACITY: usize = 4;

/// Chain length at which an insertion triggers a full rehash.
pub const DEFAULT_REHASH_THRESHOLD: usize = 2;

/// Sizing parameters for a new map.
///
/// Can be deserialized from a config document; missing fields fall back to
/// the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub initial_capacity: usize,
    pub rehash_threshold: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            rehash_threshold: DEFAULT_REHASH_THRESHOLD,
        }
    }
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Ignored by the open addressing map, which has no chains.
    pub fn with_rehash_threshold(mut self, threshold: usize) -> Self {
        self.rehash_threshold = threshold;
        self
    }

    /// Reject parameters no map can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        if i64::try_from(self.initial_capacity).is_err() {
            return Err(Error::CapacityOverflow {
                capacity: self.initial_capacity,
            });
        }
        if self.rehash_threshold == 0 {
            return Err(Error::ZeroThreshold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_parameters() {
        let c = MapConfig::default();
        assert_eq!(c.initial_capacity, 4);
        assert_eq!(c.rehash_threshold, 2);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        let c = MapConfig::new().with_initial_capacity(0);
        assert!(matches!(c.validate(), Err(Error::ZeroCapacity)));
        let c = MapConfig::new().with_rehash_threshold(0);
        assert!(matches!(c.validate(), Err(Error::ZeroThreshold)));
    }

    #[test]
    fn loads_from_json_with_defaults() {
        let c: MapConfig = serde_json::from_str(r#"{"rehash_threshold": 5}"#).unwrap();
        assert_eq!(c, MapConfig::new().with_rehash_threshold(5));

        let c: MapConfig =
            serde_json::from_str(r#"{"initial_capacity": 16, "rehash_threshold": 3}"#).unwrap();
        assert_eq!(c.initial_capacity, 16);
        assert_eq!(c.rehash_threshold, 3);
    }
}
