//! Map tile cache ("WMS cache").
//!
//! Holds computed point tiles in memory under a size budget. Lookups hand
//! out shared placeholders so a tile is computed by one caller while others
//! wait for it; see [`TileCache::get_or_compute`].

mod cache;
mod config;
mod entry;
mod resolution;
mod source;

pub use cache::{tile_key, TileCache, CLEANER_THREAD_NAME};
pub use config::{
    TileCacheConfig, DEFAULT_LARGEST_CACHEABLE_SIZE, DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE_BYTES,
    DEFAULT_MIN_SIZE_BYTES,
};
pub use entry::{TileCacheEntry, TileData};
pub use resolution::{ParseResolutionError, Resolution};
pub use source::TileSource;
