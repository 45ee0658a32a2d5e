//! Tile cache tuning.

use std::time::Duration;

/// Default high-water mark (100 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Default low-water mark (50 MiB).
pub const DEFAULT_MIN_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Default per-entry ceiling (50 MiB).
pub const DEFAULT_LARGEST_CACHEABLE_SIZE: u64 = 50 * 1024 * 1024;

/// Default age after which a tile is recomputed (1 hour).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Bounds and timings for a [`TileCache`](super::TileCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileCacheConfig {
    /// Aggregate size admissions may never exceed. Zero disables the cache.
    pub max_size_bytes: u64,
    /// Aggregate size the cleaner sweeps down to.
    pub min_size_bytes: u64,
    /// Largest single tile accepted by `put`.
    pub largest_cacheable_size: u64,
    /// Age after which `get` replaces a tile with a fresh placeholder.
    pub max_age: Duration,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            min_size_bytes: DEFAULT_MIN_SIZE_BYTES,
            largest_cacheable_size: DEFAULT_LARGEST_CACHEABLE_SIZE,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl TileCacheConfig {
    pub fn with_size_bounds(mut self, max_size_bytes: u64, min_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self.min_size_bytes = min_size_bytes;
        self
    }

    pub fn with_largest_cacheable_size(mut self, bytes: u64) -> Self {
        self.largest_cacheable_size = bytes;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Aggregate size above which the cleaner is signalled.
    pub fn trigger_size(&self) -> u64 {
        crate::cache::trigger_size(self.min_size_bytes, self.max_size_bytes)
    }
}
