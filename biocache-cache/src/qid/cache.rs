//! Bounded query cache with write-through secondary storage.
//!
//! Entries are issued a qid on `put`, written to the [`QueryStore`] and kept
//! resident in memory. A background cleaner demotes the least recently used
//! resident entries once the cache passes its trigger, and a reaper deletes
//! stored entries once their qid is older than the maximum file age.
//!
//! ```text
//! put ──► key ──► store.save ──► admit ──► over trigger? ──► gate.count_down
//!                                                               │
//!                 qid-cache-cleaner ◄───────────────────────────┘
//!                   ├─ sweep to low-water marks (demote only)
//!                   └─ reap expired keys (store + resident)
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::QidCacheConfig;
use super::entry::{QueryCacheEntry, QueryParams};
use super::error::QidCacheError;
use super::keygen::KeyGenerator;
use super::pattern::parse_qid;
use super::store::{FileStore, MemoryStore, QueryStore};
use crate::cache::{
    select_victims, CacheCounters, CacheStats, CleanerGate, EvictionCandidate, GateSignal,
    SweepTarget,
};
use crate::time::{is_older_than, now_millis};

/// Name of the background cleaner thread.
pub const CLEANER_THREAD_NAME: &str = "qid-cache-cleaner";

/// Shortest wait between reaper runs.
const MIN_REAP_WAIT: Duration = Duration::from_millis(10);

/// Result of a reaper run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapSummary {
    /// Entries deleted from secondary storage.
    pub stored_deleted: usize,
    /// Entries dropped from the resident map.
    pub resident_dropped: usize,
}

#[derive(Debug, Default)]
struct ResidentSet {
    entries: HashMap<u64, Arc<QueryCacheEntry>>,
    size_bytes: u64,
}

struct QidInner {
    config: QidCacheConfig,
    store: Arc<dyn QueryStore>,
    keys: KeyGenerator,
    resident: Mutex<ResidentSet>,
    gate: CleanerGate,
    counters: CacheCounters,
}

impl QidInner {
    /// Insert an entry into the resident map.
    ///
    /// Trims inline first if the entry would take the map past its hard
    /// maximum. Entries larger than the maximum itself are left in the store
    /// only.
    fn admit(&self, entry: Arc<QueryCacheEntry>) {
        let size = entry.size_bytes();
        let max_size = self.config.max_size_bytes;
        if size > max_size {
            debug!(
                qid = entry.key(),
                size, max_size, "Query entry larger than resident maximum, kept in store only"
            );
            return;
        }

        if self.resident.lock().size_bytes + size > max_size {
            let target = SweepTarget::entries_and_bytes(
                self.config.min_entries,
                self.config.min_size_bytes.min(max_size - size),
            );
            self.sweep_to(target);
        }

        let over_trigger = {
            let mut resident = self.resident.lock();
            if let Some(previous) = resident.entries.insert(entry.key(), entry) {
                resident.size_bytes = resident.size_bytes.saturating_sub(previous.size_bytes());
            }
            resident.size_bytes += size;
            resident.entries.len() > self.config.max_entries
                || resident.size_bytes > self.config.trigger_size()
        };

        self.counters.record_admission();
        if over_trigger {
            self.gate.count_down();
        }
    }

    /// Demote least recently used entries until the map satisfies `target`.
    fn sweep_to(&self, target: SweepTarget) -> usize {
        let candidates: Vec<_> = {
            let resident = self.resident.lock();
            resident
                .entries
                .values()
                .map(|e| EvictionCandidate::new(Arc::clone(e), e.last_use(), e.size_bytes()))
                .collect()
        };

        let victims = select_victims(candidates, target);
        if victims.is_empty() {
            return 0;
        }

        let mut evicted = 0;
        {
            let mut resident = self.resident.lock();
            for victim in victims {
                let key = victim.key.key();
                // Skip entries replaced since the snapshot
                let unchanged = resident
                    .entries
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &victim.key));
                if unchanged {
                    resident.entries.remove(&key);
                    resident.size_bytes = resident.size_bytes.saturating_sub(victim.size_bytes);
                    evicted += 1;
                }
            }
        }

        self.counters.record_evictions(evicted as u64);
        debug!(evicted, "Demoted least recently used query entries");
        evicted
    }

    fn sweep(&self) -> usize {
        self.sweep_to(SweepTarget::entries_and_bytes(
            self.config.min_entries,
            self.config.min_size_bytes,
        ))
    }

    fn reap_expired_at(&self, now: u64) -> ReapSummary {
        let max_age_ms = self.config.max_file_age.as_millis() as u64;
        let cutoff = now.saturating_sub(max_age_ms);

        let stored_deleted = match self.store.delete_older_than(cutoff) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to reap expired query entries");
                self.counters.record_store_failure();
                0
            }
        };

        let resident_dropped = {
            let mut resident = self.resident.lock();
            let before = resident.entries.len();
            let mut freed = 0;
            resident.entries.retain(|&key, entry| {
                let keep = key >= cutoff;
                if !keep {
                    freed += entry.size_bytes();
                }
                keep
            });
            resident.size_bytes = resident.size_bytes.saturating_sub(freed);
            before - resident.entries.len()
        };

        self.counters.record_expirations(resident_dropped as u64);
        if stored_deleted > 0 || resident_dropped > 0 {
            info!(stored_deleted, resident_dropped, "Reaped expired query entries");
        }

        ReapSummary {
            stored_deleted,
            resident_dropped,
        }
    }

    fn run_cleaner(inner: Arc<QidInner>) {
        let interval = inner.config.reap_interval.max(MIN_REAP_WAIT);

        loop {
            match inner.gate.wait_timeout(interval) {
                GateSignal::Closed => {
                    debug!("Query cache cleaner received shutdown signal");
                    break;
                }
                GateSignal::Open => {
                    inner.sweep();
                    inner.reap_expired_at(now_millis());
                }
                GateSignal::Timeout => {
                    inner.reap_expired_at(now_millis());
                }
            }
        }

        debug!("Query cache cleaner stopped");
    }
}

/// Bounded, self-evicting cache of search parameters keyed by qid.
///
/// Dropping the cache closes the cleaner gate and joins the cleaner thread.
///
/// # Example
///
/// ```
/// use biocache_cache::qid::{QidCacheConfig, QueryParamCache, QueryParams};
///
/// let cache = QueryParamCache::in_memory(QidCacheConfig::default());
/// let qid = cache
///     .put_params(QueryParams::new("lsid:123").with_display_query("Acacia dealbata"))
///     .unwrap();
///
/// let entry = cache.get(qid).unwrap();
/// assert_eq!(entry.display_query(), "Acacia dealbata");
/// ```
pub struct QueryParamCache {
    inner: Arc<QidInner>,
    cleaner: Option<JoinHandle<()>>,
}

impl QueryParamCache {
    /// Create a cache over the given secondary store and start its cleaner.
    pub fn new(config: QidCacheConfig, store: Arc<dyn QueryStore>) -> Self {
        let inner = Arc::new(QidInner {
            gate: CleanerGate::new(config.cleaner_batch),
            config,
            store,
            keys: KeyGenerator::new(),
            resident: Mutex::new(ResidentSet::default()),
            counters: CacheCounters::new(),
        });

        let cleaner_inner = Arc::clone(&inner);
        let cleaner = thread::Builder::new()
            .name(CLEANER_THREAD_NAME.to_string())
            .spawn(move || QidInner::run_cleaner(cleaner_inner))
            .expect("Failed to spawn query cache cleaner thread");

        info!(
            max_entries = inner.config.max_entries,
            max_size = inner.config.max_size_bytes,
            "Query cache started"
        );

        Self {
            inner,
            cleaner: Some(cleaner),
        }
    }

    /// Create a cache storing entries as JSON files under `directory`.
    pub fn with_directory(
        config: QidCacheConfig,
        directory: impl Into<PathBuf>,
    ) -> Result<Self, QidCacheError> {
        let store = FileStore::new(directory)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Create a cache whose secondary store lives in memory.
    pub fn in_memory(config: QidCacheConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    /// Store a query and return its qid.
    pub fn put(
        &self,
        query: impl Into<String>,
        display_query: impl Into<String>,
        wkt: impl Into<String>,
        bbox: Option<[f64; 4]>,
    ) -> Result<u64, QidCacheError> {
        let mut params = QueryParams::new(query)
            .with_display_query(display_query)
            .with_wkt(wkt);
        params.bbox = bbox;
        self.put_params(params)
    }

    /// Store a full set of query parameters and return its qid.
    ///
    /// Fails with [`QidCacheError::TooLarge`] when the entry exceeds the
    /// per-entry ceiling; no key is consumed in that case. A failed store
    /// write is logged and the entry is still admitted to memory.
    pub fn put_params(&self, params: QueryParams) -> Result<u64, QidCacheError> {
        let size = params.size_bytes();
        let limit = self.inner.config.largest_cacheable_size;
        if size > limit {
            self.inner.counters.record_rejection();
            debug!(size, limit, "Rejected oversized query entry");
            return Err(QidCacheError::TooLarge { size, limit });
        }

        let now = now_millis();
        let key = self.inner.keys.next_key_at(now);
        let entry = Arc::new(QueryCacheEntry::new(key, params, now));

        if let Err(e) = self.inner.store.save(&entry.to_stored()) {
            warn!(qid = key, error = %e, "Failed to write query entry to store");
            self.inner.counters.record_store_failure();
        }

        self.inner.admit(entry);
        debug!(qid = key, size, "Cached query");
        Ok(key)
    }

    /// Look up a qid.
    ///
    /// Returns `None` for keys older than the maximum file age, and for keys
    /// neither resident nor stored. Entries read back from the store are
    /// re-admitted to memory.
    pub fn get(&self, key: u64) -> Option<Arc<QueryCacheEntry>> {
        let inner = &self.inner;
        let now = now_millis();

        if is_older_than(key, inner.config.max_file_age, now) {
            inner.counters.record_miss();
            return None;
        }

        let resident = inner.resident.lock().entries.get(&key).cloned();
        if let Some(entry) = resident {
            entry.touch(now);
            inner.counters.record_hit();
            return Some(entry);
        }

        match inner.store.load(key) {
            Ok(Some(stored)) if stored.key == key => {
                let entry = Arc::new(QueryCacheEntry::from_stored(stored, now));
                inner.counters.record_store_hit();
                if entry.size_bytes() <= inner.config.largest_cacheable_size {
                    inner.admit(Arc::clone(&entry));
                }
                Some(entry)
            }
            Ok(Some(stored)) => {
                warn!(qid = key, stored_key = stored.key, "Stored query has mismatched key");
                inner.counters.record_miss();
                None
            }
            Ok(None) => {
                inner.counters.record_miss();
                None
            }
            Err(e) => {
                warn!(qid = key, error = %e, "Failed to read query entry from store");
                inner.counters.record_store_failure();
                inner.counters.record_miss();
                None
            }
        }
    }

    /// Resolve the first `qid:<id>` term in a query string.
    ///
    /// Text without a qid term is `Ok(None)`; a qid that cannot be found is
    /// [`QidCacheError::Missing`].
    pub fn entry_for_query(
        &self,
        query: &str,
    ) -> Result<Option<Arc<QueryCacheEntry>>, QidCacheError> {
        match parse_qid(query) {
            None => Ok(None),
            Some(key) => self.get(key).map(Some).ok_or(QidCacheError::Missing(key)),
        }
    }

    /// Delete stored entries older than the maximum file age and drop them
    /// from memory.
    pub fn reap_expired(&self) -> ReapSummary {
        self.inner.reap_expired_at(now_millis())
    }

    /// Demote least recently used entries down to the low-water marks now,
    /// without waiting for the cleaner. Returns the number demoted.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Drop every resident entry. Stored copies remain readable.
    pub fn clear_resident(&self) {
        let mut resident = self.inner.resident.lock();
        resident.entries.clear();
        resident.size_bytes = 0;
    }

    /// Drop every resident and stored entry. Returns the number of stored
    /// entries deleted.
    pub fn clear(&self) -> usize {
        self.clear_resident();
        match self.inner.store.delete_older_than(u64::MAX) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to clear query store");
                self.inner.counters.record_store_failure();
                0
            }
        }
    }

    /// Number of resident entries.
    pub fn resident_count(&self) -> usize {
        self.inner.resident.lock().entries.len()
    }

    /// Aggregate size of resident entries.
    pub fn resident_size(&self) -> u64 {
        self.inner.resident.lock().size_bytes
    }

    /// Most recently issued qid, or zero.
    pub fn last_key(&self) -> u64 {
        self.inner.keys.last_key()
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, bytes) = {
            let resident = self.inner.resident.lock();
            (resident.entries.len(), resident.size_bytes)
        };
        self.inner.counters.snapshot(entries, bytes)
    }

    pub fn config(&self) -> &QidCacheConfig {
        &self.inner.config
    }

    /// The secondary store behind this cache.
    pub fn store(&self) -> &dyn QueryStore {
        self.inner.store.as_ref()
    }

    /// Whether the cleaner thread is still running.
    pub fn is_running(&self) -> bool {
        self.cleaner
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for QueryParamCache {
    fn drop(&mut self) {
        self.inner.gate.close();
        if let Some(handle) = self.cleaner.take() {
            if let Err(e) = handle.join() {
                warn!("Query cache cleaner thread panicked: {:?}", e);
            }
        }
    }
}

impl std::fmt::Debug for QueryParamCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParamCache")
            .field("config", &self.inner.config)
            .field("resident_count", &self.resident_count())
            .field("resident_size", &self.resident_size())
            .finish()
    }
}
