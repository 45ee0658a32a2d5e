//! Cache statistics tracking and reporting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated on the hot path of a cache.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    store_hits: AtomicU64,
    admissions: AtomicU64,
    rejections: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    store_failures: AtomicU64,
}

impl CacheCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A resident miss served from secondary storage.
    pub fn record_store_hit(&self) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission(&self) {
        self.admissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Entries dropped for exceeding their maximum age.
    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self, resident_entries: usize, resident_bytes: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            admissions: self.admissions.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            resident_entries,
            resident_bytes,
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the resident map.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Resident misses answered from secondary storage (qid cache only).
    pub store_hits: u64,
    /// Entries admitted to the resident map.
    pub admissions: u64,
    /// Entries refused admission.
    pub rejections: u64,
    /// Entries removed by LRU sweeps.
    pub evictions: u64,
    /// Entries removed for exceeding their maximum age.
    pub expirations: u64,
    /// Secondary storage reads or writes that failed.
    pub store_failures: u64,
    /// Entries currently resident.
    pub resident_entries: usize,
    /// Aggregate size of resident entries.
    pub resident_bytes: u64,
}

impl CacheStats {
    /// Fraction of lookups answered without recomputation (0.0 to 1.0).
    ///
    /// Secondary storage hits count as hits.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.store_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
