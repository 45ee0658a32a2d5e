//! Bounded, concurrent, self-evicting caches for an occurrence search service.
//!
//! - [`qid`] - stores search parameters under a numeric id (`qid:<id>`),
//!   bounded in memory and written through to a directory of JSON files
//! - [`tile`] - holds computed map tiles in memory under a size budget
//!
//! Each cache owns a background cleaner thread that evicts the least
//! recently used entries once the cache passes its trigger. Request paths
//! never wait for the cleaner.
//!
//! # Example
//!
//! ```
//! use biocache_cache::qid::{QidCacheConfig, QueryParamCache, QueryParams};
//! use biocache_cache::tile::{Resolution, TileCache, TileCacheConfig};
//!
//! let qids = QueryParamCache::in_memory(QidCacheConfig::default());
//! let qid = qids.put_params(QueryParams::new("lsid:123")).unwrap();
//! assert_eq!(qids.get(qid).unwrap().query(), "lsid:123");
//!
//! let tiles = TileCache::new(TileCacheConfig::default());
//! let tile = tiles.get("lsid:123", "grid", Resolution::Point01);
//! assert!(!tile.is_cached());
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod qid;
pub mod system;
pub mod tile;
pub mod time;

pub use system::{CacheSystem, CacheSystemError};

/// Version of the library and CLI.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
