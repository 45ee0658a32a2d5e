//! Bounded in-memory tile cache.
//!
//! Tiles are keyed by query, colour mode and resolution. A lookup never
//! fails: a missing or expired tile is replaced by an empty placeholder that
//! every concurrent caller shares, so only one of them needs to compute it.
//!
//! # Accounting
//!
//! Every mutation that changes the aggregate size holds the state lock
//! before touching the map, so the aggregate always equals the sum of the
//! charges of resident tiles. Lock order is state lock, then map shard.
//! The lock-free fast path in `get` only reads.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::config::TileCacheConfig;
use super::entry::TileCacheEntry;
use super::resolution::Resolution;
use super::source::TileSource;
use crate::cache::size::tile_size_estimate;
use crate::cache::{
    select_victims, CacheCounters, CacheStats, CleanerGate, EvictionCandidate, GateSignal,
    SweepTarget,
};
use crate::time::now_millis;

/// Name of the background cleaner thread.
pub const CLEANER_THREAD_NAME: &str = "tile-cache-cleaner";

/// Cache key for a tile.
///
/// # Example
///
/// ```
/// use biocache_cache::tile::{tile_key, Resolution};
///
/// assert_eq!(
///     tile_key("taxon_name:Acacia", "grid", Resolution::Point01),
///     "taxon_name:Acacia|grid|point-0.1"
/// );
/// ```
pub fn tile_key(query: &str, colour_mode: &str, resolution: Resolution) -> String {
    format!("{}|{}|{}", query, colour_mode, resolution.label())
}

/// A resident tile and the size charged to the aggregate for it.
#[derive(Debug)]
struct Slot {
    entry: Arc<TileCacheEntry>,
    charged: u64,
}

struct TileInner {
    config: TileCacheConfig,
    map: DashMap<String, Slot>,
    /// Aggregate charged size; also the lock serialising size changes.
    size: Mutex<u64>,
    gate: CleanerGate,
    counters: CacheCounters,
}

impl TileInner {
    /// Remove `key` if it still maps to `entry`. Returns the freed charge.
    fn remove_if_same(&self, key: &str, entry: &Arc<TileCacheEntry>) -> Option<u64> {
        let mut total = self.size.lock();
        let (_, slot) = self
            .map
            .remove_if(key, |_, slot| Arc::ptr_eq(&slot.entry, entry))?;
        *total = total.saturating_sub(slot.charged);
        Some(slot.charged)
    }

    /// Evict least recently used tiles until the aggregate is at or below
    /// the low-water mark.
    fn sweep(&self) -> usize {
        let candidates: Vec<_> = self
            .map
            .iter()
            .map(|r| {
                let slot = r.value();
                EvictionCandidate::new(
                    (r.key().clone(), Arc::clone(&slot.entry)),
                    slot.entry.last_use(),
                    slot.charged,
                )
            })
            .collect();

        let victims = select_victims(candidates, SweepTarget::bytes(self.config.min_size_bytes));
        if victims.is_empty() {
            return 0;
        }

        let mut evicted = 0;
        let mut freed = 0;
        for victim in victims {
            let (key, entry) = victim.key;
            if let Some(charge) = self.remove_if_same(&key, &entry) {
                evicted += 1;
                freed += charge;
            }
        }

        self.counters.record_evictions(evicted as u64);
        debug!(evicted, freed, "Evicted least recently used tiles");
        evicted
    }

    fn run_cleaner(inner: Arc<TileInner>) {
        loop {
            match inner.gate.wait() {
                GateSignal::Closed => {
                    debug!("Tile cache cleaner received shutdown signal");
                    break;
                }
                GateSignal::Open | GateSignal::Timeout => {
                    inner.sweep();
                }
            }
        }

        debug!("Tile cache cleaner stopped");
    }
}

/// Bounded, self-evicting cache of computed map tiles.
///
/// Dropping the cache closes the cleaner gate and joins the cleaner thread.
pub struct TileCache {
    inner: Arc<TileInner>,
    cleaner: Option<JoinHandle<()>>,
}

impl TileCache {
    /// Create a cache and start its cleaner.
    pub fn new(config: TileCacheConfig) -> Self {
        let inner = Arc::new(TileInner {
            config,
            map: DashMap::new(),
            size: Mutex::new(0),
            gate: CleanerGate::new(1),
            counters: CacheCounters::new(),
        });

        let cleaner_inner = Arc::clone(&inner);
        let cleaner = thread::Builder::new()
            .name(CLEANER_THREAD_NAME.to_string())
            .spawn(move || TileInner::run_cleaner(cleaner_inner))
            .expect("Failed to spawn tile cache cleaner thread");

        info!(
            max_size = inner.config.max_size_bytes,
            enabled = inner.config.max_size_bytes > 0,
            "Tile cache started"
        );

        Self {
            inner,
            cleaner: Some(cleaner),
        }
    }

    /// Get the tile for a key, creating a placeholder if needed.
    ///
    /// A resident tile older than the maximum age is replaced with a fresh
    /// placeholder. Callers racing on the same missing key all receive the
    /// same placeholder.
    pub fn get(
        &self,
        query: &str,
        colour_mode: &str,
        resolution: Resolution,
    ) -> Arc<TileCacheEntry> {
        let inner = &self.inner;
        let key = tile_key(query, colour_mode, resolution);
        let now = now_millis();

        // The shard guard must be released before taking the state lock
        let fresh = inner.map.get(&key).and_then(|slot| {
            (!slot.entry.is_expired(inner.config.max_age, now)).then(|| Arc::clone(&slot.entry))
        });

        let entry = match fresh {
            Some(entry) => entry,
            None => {
                let mut total = inner.size.lock();
                match inner.map.entry(key) {
                    Entry::Occupied(mut occupied) => {
                        if occupied.get().entry.is_expired(inner.config.max_age, now) {
                            *total = total.saturating_sub(occupied.get().charged);
                            inner.counters.record_expirations(1);
                            debug!(key = %occupied.key(), "Replacing expired tile");
                            let placeholder =
                                Arc::new(TileCacheEntry::placeholder(query, colour_mode, now));
                            occupied.insert(Slot {
                                entry: Arc::clone(&placeholder),
                                charged: 0,
                            });
                            placeholder
                        } else {
                            Arc::clone(&occupied.get().entry)
                        }
                    }
                    Entry::Vacant(vacant) => {
                        let placeholder =
                            Arc::new(TileCacheEntry::placeholder(query, colour_mode, now));
                        vacant.insert(Slot {
                            entry: Arc::clone(&placeholder),
                            charged: 0,
                        });
                        placeholder
                    }
                }
            }
        };

        entry.touch(now);
        if entry.is_cached() {
            inner.counters.record_hit();
        } else {
            inner.counters.record_miss();
        }
        entry
    }

    /// Offer a populated tile for admission.
    ///
    /// The entry's size is recomputed first. Returns `false` when the cache
    /// is disabled or full, the tile exceeds the per-entry ceiling, or
    /// admitting it would take the aggregate past the maximum. On success
    /// the tile replaces whatever was resident under its key and is marked
    /// cached.
    pub fn put(
        &self,
        query: &str,
        colour_mode: &str,
        resolution: Resolution,
        entry: &Arc<TileCacheEntry>,
    ) -> bool {
        let inner = &self.inner;
        if !self.is_enabled() || self.is_full() {
            inner.counters.record_rejection();
            return false;
        }

        let size = entry.update_size();
        if size > inner.config.largest_cacheable_size {
            inner.counters.record_rejection();
            debug!(
                size,
                limit = inner.config.largest_cacheable_size,
                "Tile too large to cache"
            );
            return false;
        }

        let key = tile_key(query, colour_mode, resolution);
        let new_total = {
            let mut total = inner.size.lock();
            let slot = Slot {
                entry: Arc::clone(entry),
                charged: size,
            };
            match inner.map.entry(key) {
                Entry::Occupied(mut occupied) => {
                    let new_total = *total - occupied.get().charged.min(*total) + size;
                    if new_total > inner.config.max_size_bytes {
                        inner.counters.record_rejection();
                        return false;
                    }
                    occupied.insert(slot);
                    *total = new_total;
                }
                Entry::Vacant(vacant) => {
                    let new_total = *total + size;
                    if new_total > inner.config.max_size_bytes {
                        inner.counters.record_rejection();
                        return false;
                    }
                    vacant.insert(slot);
                    *total = new_total;
                }
            }
            entry.mark_cached();
            *total
        };

        inner.counters.record_admission();
        if new_total > inner.config.trigger_size() {
            inner.gate.count_down();
        }
        true
    }

    /// Whether a tile of `point_count` points could be admitted.
    ///
    /// When it could not, the estimate is recorded on `entry` so callers can
    /// report why the tile was not cached.
    pub fn is_cachable(
        &self,
        entry: Option<&TileCacheEntry>,
        point_count: usize,
        has_counts: bool,
    ) -> bool {
        let estimate = tile_size_estimate(point_count, has_counts);
        if estimate <= self.inner.config.largest_cacheable_size {
            return true;
        }

        if let Some(entry) = entry {
            entry.set_size_hint(estimate);
        }
        false
    }

    /// Get a tile, computing it with `source` if it is not cached.
    ///
    /// Only one caller computes a given placeholder at a time; the others
    /// wait on its fill lock and then see the cached result. A result that
    /// cannot be admitted is returned detached from the cache.
    pub fn get_or_compute<S: TileSource>(
        &self,
        query: &str,
        colour_mode: &str,
        resolution: Resolution,
        source: &S,
    ) -> Result<Arc<TileCacheEntry>, S::Error> {
        let entry = self.get(query, colour_mode, resolution);
        if entry.is_cached() {
            return Ok(entry);
        }

        let detached = {
            let _fill = entry.fill_lock();
            if entry.is_cached() {
                None
            } else {
                self.fill_placeholder(query, colour_mode, resolution, &entry, source)?
            }
        };

        Ok(detached.unwrap_or(entry))
    }

    /// Compute and admit a placeholder while holding its fill lock.
    ///
    /// Returns a detached entry when the result is not cachable.
    fn fill_placeholder<S: TileSource>(
        &self,
        query: &str,
        colour_mode: &str,
        resolution: Resolution,
        entry: &Arc<TileCacheEntry>,
        source: &S,
    ) -> Result<Option<Arc<TileCacheEntry>>, S::Error> {
        let key = tile_key(query, colour_mode, resolution);

        let cachable = source
            .estimate_points(query, resolution)
            .map(|points| self.is_cachable(Some(entry.as_ref()), points, false))
            .unwrap_or(true);

        let data = match source.compute(query, colour_mode, resolution) {
            Ok(data) => data,
            Err(e) => {
                self.inner.remove_if_same(&key, entry);
                return Err(e);
            }
        };

        if !cachable {
            self.inner.remove_if_same(&key, entry);
            debug!(key = %key, "Returning uncachable tile detached");
            return Ok(Some(Arc::new(TileCacheEntry::with_data(data, now_millis()))));
        }

        entry.populate(data);
        if !self.put(query, colour_mode, resolution, entry) {
            self.inner.remove_if_same(&key, entry);
            debug!(key = %key, size = entry.size_bytes(), "Tile not admitted");
        }
        Ok(None)
    }

    /// Remove a tile. Returns `true` if one was resident.
    pub fn remove(&self, query: &str, colour_mode: &str, resolution: Resolution) -> bool {
        let key = tile_key(query, colour_mode, resolution);
        let mut total = self.inner.size.lock();
        match self.inner.map.remove(&key) {
            Some((_, slot)) => {
                *total = total.saturating_sub(slot.charged);
                true
            }
            None => false,
        }
    }

    /// Remove every tile.
    pub fn empty(&self) {
        let mut total = self.inner.size.lock();
        self.inner.map.clear();
        *total = 0;
        info!("Tile cache emptied");
    }

    /// Evict least recently used tiles down to the low-water mark now.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Whether the cache admits anything at all.
    pub fn is_enabled(&self) -> bool {
        self.inner.config.max_size_bytes > 0
    }

    /// Whether the aggregate has reached the maximum.
    pub fn is_full(&self) -> bool {
        *self.inner.size.lock() >= self.inner.config.max_size_bytes
    }

    /// Aggregate size of resident tiles.
    pub fn size_bytes(&self) -> u64 {
        *self.inner.size.lock()
    }

    /// Number of resident tiles, placeholders included.
    pub fn len(&self) -> usize {
        self.inner.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let bytes = self.size_bytes();
        self.inner.counters.snapshot(self.len(), bytes)
    }

    pub fn config(&self) -> &TileCacheConfig {
        &self.inner.config
    }

    /// Whether the cleaner thread is still running.
    pub fn is_running(&self) -> bool {
        self.cleaner
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for TileCache {
    fn drop(&mut self) {
        self.inner.gate.close();
        if let Some(handle) = self.cleaner.take() {
            if let Err(e) = handle.join() {
                warn!("Tile cache cleaner thread panicked: {:?}", e);
            }
        }
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("config", &self.inner.config)
            .field("len", &self.len())
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileData;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn data_with_points(query: &str, points: usize) -> TileData {
        TileData {
            query: query.to_string(),
            colour_mode: "grid".to_string(),
            points: vec![vec![[145.0, -37.0]; points]],
            counts: None,
            colours: vec![0xFF0000],
            bbox: Some([145.0, -37.0, 145.0, -37.0]),
        }
    }

    fn fill(cache: &TileCache, query: &str, points: usize) -> (Arc<TileCacheEntry>, bool) {
        let entry = cache.get(query, "grid", Resolution::Point01);
        entry.populate(data_with_points(query, points));
        let admitted = cache.put(query, "grid", Resolution::Point01, &entry);
        (entry, admitted)
    }

    struct CountingSource {
        calls: AtomicUsize,
        points: usize,
        estimate: Option<usize>,
    }

    impl CountingSource {
        fn new(points: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                points,
                estimate: None,
            }
        }
    }

    impl TileSource for CountingSource {
        type Error = String;

        fn estimate_points(&self, _query: &str, _resolution: Resolution) -> Option<usize> {
            self.estimate
        }

        fn compute(
            &self,
            query: &str,
            _colour_mode: &str,
            _resolution: Resolution,
        ) -> Result<TileData, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(data_with_points(query, self.points))
        }
    }

    struct FailingSource;

    impl TileSource for FailingSource {
        type Error = String;

        fn compute(&self, _: &str, _: &str, _: Resolution) -> Result<TileData, String> {
            Err("index unavailable".to_string())
        }
    }

    #[test]
    fn test_get_returns_shared_placeholder() {
        let cache = TileCache::new(TileCacheConfig::default());
        let a = cache.get("q", "grid", Resolution::Point1);
        let b = cache.get("q", "grid", Resolution::Point1);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_cached());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_put_admits_and_charges_size() {
        let cache = TileCache::new(TileCacheConfig::default());
        let (entry, admitted) = fill(&cache, "q", 10);

        assert!(admitted);
        assert!(entry.is_cached());
        assert_eq!(cache.size_bytes(), entry.size_bytes());

        let again = cache.get("q", "grid", Resolution::Point01);
        assert!(Arc::ptr_eq(&entry, &again));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_put_replacing_entry_recharges() {
        let cache = TileCache::new(TileCacheConfig::default());
        fill(&cache, "q", 10);

        let replacement = Arc::new(TileCacheEntry::with_data(data_with_points("q", 20), 0));
        assert!(cache.put("q", "grid", Resolution::Point01, &replacement));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size_bytes(), replacement.size_bytes());
    }

    #[test]
    fn test_put_rejects_oversized_tile() {
        let probe = data_with_points("q", 100).size_bytes();
        let cache = TileCache::new(TileCacheConfig::default().with_largest_cacheable_size(probe - 1));
        let (entry, admitted) = fill(&cache, "q", 100);

        assert!(!admitted);
        assert!(!entry.is_cached());
        assert_eq!(entry.size_bytes(), probe);
        assert_eq!(cache.size_bytes(), 0);
        assert_eq!(cache.stats().rejections, 1);
    }

    #[test]
    fn test_put_rejects_beyond_maximum() {
        let one = data_with_points("a", 10).size_bytes();
        // Equal water marks keep the cleaner out of the way
        let config = TileCacheConfig::default().with_size_bounds(one + one / 2, one + one / 2);
        let cache = TileCache::new(config);

        assert!(fill(&cache, "a", 10).1);
        assert!(!fill(&cache, "b", 10).1);
        assert!(cache.size_bytes() <= one + one / 2);
    }

    #[test]
    fn test_disabled_cache_admits_nothing() {
        let cache = TileCache::new(TileCacheConfig::default().with_size_bounds(0, 0));
        assert!(!cache.is_enabled());
        assert!(cache.is_full());

        let (entry, admitted) = fill(&cache, "q", 1);
        assert!(!admitted);
        assert!(!entry.is_cached());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_expired_tile_replaced() {
        let cache = TileCache::new(TileCacheConfig::default().with_max_age(Duration::from_millis(30)));
        let (old, _) = fill(&cache, "q", 10);
        assert!(cache.size_bytes() > 0);

        thread::sleep(Duration::from_millis(80));
        let fresh = cache.get("q", "grid", Resolution::Point01);

        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(!fresh.is_cached());
        assert_eq!(cache.size_bytes(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_remove_and_empty() {
        let cache = TileCache::new(TileCacheConfig::default());
        fill(&cache, "a", 10);
        fill(&cache, "b", 10);

        assert!(cache.remove("a", "grid", Resolution::Point01));
        assert!(!cache.remove("a", "grid", Resolution::Point01));
        assert_eq!(cache.len(), 1);

        cache.empty();
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_sweep_evicts_oldest_first() {
        let one = data_with_points("a", 10).size_bytes();
        let config = TileCacheConfig::default().with_size_bounds(one * 100, one * 2);
        let cache = TileCache::new(config);

        fill(&cache, "a", 10);
        thread::sleep(Duration::from_millis(5));
        fill(&cache, "b", 10);
        thread::sleep(Duration::from_millis(5));
        fill(&cache, "c", 10);
        thread::sleep(Duration::from_millis(5));
        cache.get("a", "grid", Resolution::Point01);

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.size_bytes(), one * 2);
        // "b" was least recently used
        assert!(!cache.get("b", "grid", Resolution::Point01).is_cached());
        assert!(cache.get("a", "grid", Resolution::Point01).is_cached());
    }

    #[test]
    fn test_is_cachable_records_hint() {
        let cache = TileCache::new(TileCacheConfig::default().with_largest_cacheable_size(1_000));
        let entry = TileCacheEntry::placeholder("q", "grid", 0);

        assert!(cache.is_cachable(Some(&entry), 10, true));
        assert_eq!(entry.size_bytes(), 0);

        assert!(!cache.is_cachable(Some(&entry), 1_000, true));
        assert_eq!(entry.size_bytes(), tile_size_estimate(1_000, true));
        assert!(!cache.is_cachable(None, 1_000, false));
    }

    #[test]
    fn test_get_or_compute_computes_once() {
        let cache = TileCache::new(TileCacheConfig::default());
        let source = CountingSource::new(5);

        let first = cache.get_or_compute("q", "grid", Resolution::Point1, &source).unwrap();
        let second = cache.get_or_compute("q", "grid", Resolution::Point1, &source).unwrap();

        assert!(first.is_cached());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.data().point_count(), 5);
    }

    #[test]
    fn test_get_or_compute_detaches_uncachable() {
        let cache = TileCache::new(TileCacheConfig::default().with_largest_cacheable_size(1_000));
        let mut source = CountingSource::new(5);
        source.estimate = Some(10_000);

        let entry = cache.get_or_compute("q", "grid", Resolution::Point1, &source).unwrap();

        assert!(!entry.is_cached());
        assert_eq!(entry.data().point_count(), 5);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_compute_error_drops_placeholder() {
        let cache = TileCache::new(TileCacheConfig::default());
        let result = cache.get_or_compute("q", "grid", Resolution::Raw, &FailingSource);

        assert_eq!(result.err(), Some("index unavailable".to_string()));
        assert!(cache.is_empty());
    }
}
