//! Per-instance table configuration.

use crate::error::MapError;

/// Initial bucket count of a map built with defaults.
pub const DEFAULT_BUCKETS: usize = 2;

/// Growth threshold of a map built with defaults.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.95;

/// Sizing knobs fixed at construction. Each map owns its copy; changing
/// one map's load factor never affects another.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapConfig {
    pub buckets: usize,
    pub max_load_factor: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl MapConfig {
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn with_max_load_factor(mut self, max_load_factor: f32) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if self.buckets == 0 {
            return Err(MapError::ZeroBuckets);
        }
        check_load_factor(self.max_load_factor)
    }
}

/// Smallest accepted load factor. Anything lower sizes the table beyond
/// what can be allocated on the first insert.
pub const MIN_MAX_LOAD_FACTOR: f32 = f32::EPSILON;

pub(crate) fn check_load_factor(f: f32) -> Result<(), MapError> {
    if f.is_finite() && f >= MIN_MAX_LOAD_FACTOR {
        Ok(())
    } else {
        Err(MapError::InvalidLoadFactor(f))
    }
}
