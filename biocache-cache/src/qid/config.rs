//! Query cache tuning.

use std::time::Duration;

/// Default high-water mark for resident entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Default low-water mark for resident entries.
pub const DEFAULT_MIN_ENTRIES: usize = 5;

/// Default high-water mark for resident bytes (100 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Default low-water mark for resident bytes (50 MiB).
pub const DEFAULT_MIN_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Default per-entry ceiling (5 MiB).
pub const DEFAULT_LARGEST_CACHEABLE_SIZE: u64 = 5 * 1024 * 1024;

/// Default age after which stored entries are reaped (24 hours).
pub const DEFAULT_MAX_FILE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of over-trigger admits that wake the cleaner.
pub const DEFAULT_CLEANER_BATCH: usize = 1;

/// Default interval between reaper runs without traffic (1 hour).
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Bounds and timings for a [`QueryParamCache`](super::QueryParamCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QidCacheConfig {
    /// Resident entry count above which the cleaner is signalled.
    pub max_entries: usize,
    /// Resident entry count the cleaner sweeps down to.
    pub min_entries: usize,
    /// Resident bytes that an admit may never exceed.
    pub max_size_bytes: u64,
    /// Resident bytes the cleaner sweeps down to.
    pub min_size_bytes: u64,
    /// Largest single entry accepted by `put`.
    pub largest_cacheable_size: u64,
    /// Age after which an entry is unreachable and reaped from the store.
    pub max_file_age: Duration,
    /// Over-trigger admits needed to wake the cleaner.
    pub cleaner_batch: usize,
    /// How often the reaper runs when nothing wakes the cleaner.
    pub reap_interval: Duration,
}

impl Default for QidCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            min_entries: DEFAULT_MIN_ENTRIES,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            min_size_bytes: DEFAULT_MIN_SIZE_BYTES,
            largest_cacheable_size: DEFAULT_LARGEST_CACHEABLE_SIZE,
            max_file_age: DEFAULT_MAX_FILE_AGE,
            cleaner_batch: DEFAULT_CLEANER_BATCH,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl QidCacheConfig {
    pub fn with_entry_bounds(mut self, max_entries: usize, min_entries: usize) -> Self {
        self.max_entries = max_entries;
        self.min_entries = min_entries;
        self
    }

    pub fn with_size_bounds(mut self, max_size_bytes: u64, min_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self.min_size_bytes = min_size_bytes;
        self
    }

    pub fn with_largest_cacheable_size(mut self, bytes: u64) -> Self {
        self.largest_cacheable_size = bytes;
        self
    }

    pub fn with_max_file_age(mut self, age: Duration) -> Self {
        self.max_file_age = age;
        self
    }

    pub fn with_cleaner_batch(mut self, batch: usize) -> Self {
        self.cleaner_batch = batch;
        self
    }

    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Resident bytes above which the cleaner is signalled.
    pub fn trigger_size(&self) -> u64 {
        crate::cache::trigger_size(self.min_size_bytes, self.max_size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QidCacheConfig::default();
        assert_eq!(config.max_entries, 10);
        assert_eq!(config.min_entries, 5);
        assert_eq!(config.max_size_bytes, 104_857_600);
        assert_eq!(config.min_size_bytes, 52_428_800);
        assert_eq!(config.largest_cacheable_size, 5_242_880);
        assert_eq!(config.max_file_age, Duration::from_secs(86_400));
        assert_eq!(config.cleaner_batch, 1);
        assert_eq!(config.trigger_size(), 78_643_200);
    }

    #[test]
    fn test_builders() {
        let config = QidCacheConfig::default()
            .with_entry_bounds(4, 2)
            .with_size_bounds(1_000, 500)
            .with_largest_cacheable_size(100)
            .with_max_file_age(Duration::from_secs(60))
            .with_cleaner_batch(3)
            .with_reap_interval(Duration::from_secs(5));

        assert_eq!((config.max_entries, config.min_entries), (4, 2));
        assert_eq!((config.max_size_bytes, config.min_size_bytes), (1_000, 500));
        assert_eq!(config.largest_cacheable_size, 100);
        assert_eq!(config.max_file_age, Duration::from_secs(60));
        assert_eq!(config.cleaner_batch, 3);
        assert_eq!(config.reap_interval, Duration::from_secs(5));
        assert_eq!(config.trigger_size(), 750);
    }
}
