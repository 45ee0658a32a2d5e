//! Both caches wired up from a configuration file.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigFile, ConfigFileError};
use crate::qid::{QidCacheError, QueryParamCache};
use crate::tile::TileCache;

/// Errors building a [`CacheSystem`].
#[derive(Debug, Error)]
pub enum CacheSystemError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error("Failed to open query cache: {0}")]
    QueryCache(#[from] QidCacheError),
}

/// The query cache and the tile cache of one process.
///
/// Each cache is shared behind an `Arc`; cloning the handles is cheap and
/// the caches shut down once the last handle is dropped.
#[derive(Debug, Clone)]
pub struct CacheSystem {
    qid: Arc<QueryParamCache>,
    tile: Arc<TileCache>,
}

impl CacheSystem {
    /// Build both caches from loaded configuration.
    pub fn from_config(config: &ConfigFile) -> Result<Self, CacheSystemError> {
        let qid = QueryParamCache::with_directory(
            config.qid.to_cache_config(),
            config.qid.directory.clone(),
        )?;
        let tile = TileCache::new(config.tile.to_cache_config());

        info!(
            qid_directory = %config.qid.directory.display(),
            tile_enabled = tile.is_enabled(),
            "Cache system ready"
        );

        Ok(Self {
            qid: Arc::new(qid),
            tile: Arc::new(tile),
        })
    }

    /// Load configuration from the default path and build both caches.
    pub fn load() -> Result<Self, CacheSystemError> {
        Self::from_config(&ConfigFile::load()?)
    }

    pub fn qid(&self) -> &Arc<QueryParamCache> {
        &self.qid
    }

    pub fn tile(&self) -> &Arc<TileCache> {
        &self.tile
    }
}
