//! Tile cache entries.

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::cache::size::tile_entry_size;
use crate::time::is_older_than;

/// Computed content of a map tile.
///
/// Points are grouped into segments, one per colour band; `counts`, when
/// present, holds the occurrence count for each point in the same layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileData {
    pub query: String,
    pub colour_mode: String,
    /// Point segments as `[lon, lat]` pairs.
    pub points: Vec<Vec<[f32; 2]>>,
    /// Occurrence counts parallel to `points`.
    pub counts: Option<Vec<Vec<i32>>>,
    /// One ARGB colour per segment.
    pub colours: Vec<i32>,
    /// Extent as `[min_lon, min_lat, max_lon, max_lat]`.
    pub bbox: Option<[f64; 4]>,
}

impl TileData {
    /// Empty tile data for a query and colour mode.
    pub fn new(query: impl Into<String>, colour_mode: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            colour_mode: colour_mode.into(),
            ..Default::default()
        }
    }

    /// Total points across all segments.
    pub fn point_count(&self) -> usize {
        self.points.iter().map(Vec::len).sum()
    }

    /// Total count values across all segments.
    pub fn count_values(&self) -> usize {
        self.counts
            .as_ref()
            .map(|c| c.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Approximate in-memory cost.
    pub fn size_bytes(&self) -> u64 {
        tile_entry_size(
            &self.query,
            &self.colour_mode,
            self.point_count(),
            self.count_values(),
            self.colours.len(),
        )
    }
}

/// A tile shared between the cache and its readers.
///
/// `get` hands out placeholders with empty data; the producer holding the
/// fill lock populates it in place and offers it back with `put`, at which
/// point it becomes cached.
#[derive(Debug)]
pub struct TileCacheEntry {
    data: RwLock<TileData>,
    cached: AtomicBool,
    size_bytes: AtomicU64,
    created: u64,
    last_use: AtomicU64,
    fill_lock: Mutex<()>,
}

impl TileCacheEntry {
    /// Create an empty placeholder created at `now`.
    pub fn placeholder(query: impl Into<String>, colour_mode: impl Into<String>, now: u64) -> Self {
        Self::with_data(TileData::new(query, colour_mode), now)
    }

    /// Create an entry holding `data`, created at `now`.
    pub fn with_data(data: TileData, now: u64) -> Self {
        Self {
            data: RwLock::new(data),
            cached: AtomicBool::new(false),
            size_bytes: AtomicU64::new(0),
            created: now,
            last_use: AtomicU64::new(now),
            fill_lock: Mutex::new(()),
        }
    }

    /// Read access to the tile data.
    pub fn data(&self) -> RwLockReadGuard<'_, TileData> {
        self.data.read()
    }

    /// Replace the tile data.
    ///
    /// Does not change the charged size; `put` recomputes it.
    pub fn populate(&self, data: TileData) {
        *self.data.write() = data;
    }

    /// Whether the tile holds any points.
    pub fn is_populated(&self) -> bool {
        self.data.read().points.iter().any(|segment| !segment.is_empty())
    }

    /// Recompute and record the size of the current data.
    pub fn update_size(&self) -> u64 {
        let size = self.data.read().size_bytes();
        self.size_bytes.store(size, Ordering::Relaxed);
        size
    }

    /// Last computed or hinted size.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }

    /// Record an estimated size, e.g. when a pre-check rejects the tile.
    pub fn set_size_hint(&self, bytes: u64) {
        self.size_bytes.store(bytes, Ordering::Relaxed);
    }

    /// Whether the tile has been admitted to a cache.
    pub fn is_cached(&self) -> bool {
        self.cached.load(Ordering::Acquire)
    }

    pub(crate) fn mark_cached(&self) {
        self.cached.store(true, Ordering::Release);
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn last_use(&self) -> u64 {
        self.last_use.load(Ordering::Relaxed)
    }

    /// Record a use at `now`. Never moves the timestamp backwards.
    pub fn touch(&self, now: u64) {
        self.last_use.fetch_max(now, Ordering::Relaxed);
    }

    /// Whether the tile was created more than `max_age` before `now`.
    pub fn is_expired(&self, max_age: Duration, now: u64) -> bool {
        is_older_than(self.created, max_age, now)
    }

    /// Lock held by the single producer filling this tile.
    pub fn fill_lock(&self) -> MutexGuard<'_, ()> {
        self.fill_lock.lock()
    }
}
