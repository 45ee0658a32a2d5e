//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::qid::QidCacheConfig;
use crate::tile::TileCacheConfig;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Query cache settings
    pub qid: QidSettings,
    /// Tile cache settings
    pub tile: TileSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[qid]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QidSettings {
    /// Directory holding stored query files
    pub directory: PathBuf,
    pub max_entries: usize,
    pub min_entries: usize,
    /// Resident size high-water mark in bytes
    pub max_size: u64,
    /// Resident size low-water mark in bytes
    pub min_size: u64,
    pub largest_cacheable_size: u64,
    pub max_file_age_secs: u64,
    pub cleaner_batch: usize,
    pub reap_interval_secs: u64,
}

impl QidSettings {
    /// Cache tuning described by these settings.
    pub fn to_cache_config(&self) -> QidCacheConfig {
        QidCacheConfig {
            max_entries: self.max_entries,
            min_entries: self.min_entries,
            max_size_bytes: self.max_size,
            min_size_bytes: self.min_size,
            largest_cacheable_size: self.largest_cacheable_size,
            max_file_age: Duration::from_secs(self.max_file_age_secs),
            cleaner_batch: self.cleaner_batch,
            reap_interval: Duration::from_secs(self.reap_interval_secs),
        }
    }
}

/// `[tile]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSettings {
    /// Aggregate size high-water mark in bytes; zero disables the cache
    pub max_size: u64,
    /// Aggregate size low-water mark in bytes
    pub min_size: u64,
    pub largest_cacheable_size: u64,
    pub max_age_secs: u64,
}

impl TileSettings {
    /// Cache tuning described by these settings.
    pub fn to_cache_config(&self) -> TileCacheConfig {
        TileCacheConfig {
            max_size_bytes: self.max_size,
            min_size_bytes: self.min_size,
            largest_cacheable_size: self.largest_cacheable_size,
            max_age: Duration::from_secs(self.max_age_secs),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for log files
    pub directory: PathBuf,
    /// Log file name within the directory
    pub file: String,
}
