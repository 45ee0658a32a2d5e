//! Default values for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::qid;
use crate::tile;

/// Name of the configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".biocache-cache";

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "biocache-cache.log";

pub const DEFAULT_QID_MAX_ENTRIES: usize = qid::DEFAULT_MAX_ENTRIES;
pub const DEFAULT_QID_MIN_ENTRIES: usize = qid::DEFAULT_MIN_ENTRIES;
pub const DEFAULT_QID_MAX_SIZE: u64 = qid::DEFAULT_MAX_SIZE_BYTES;
pub const DEFAULT_QID_MIN_SIZE: u64 = qid::DEFAULT_MIN_SIZE_BYTES;
pub const DEFAULT_QID_LARGEST_CACHEABLE_SIZE: u64 = qid::DEFAULT_LARGEST_CACHEABLE_SIZE;
pub const DEFAULT_QID_MAX_FILE_AGE_SECS: u64 = qid::DEFAULT_MAX_FILE_AGE.as_secs();
pub const DEFAULT_QID_CLEANER_BATCH: usize = qid::DEFAULT_CLEANER_BATCH;
pub const DEFAULT_QID_REAP_INTERVAL_SECS: u64 = qid::DEFAULT_REAP_INTERVAL.as_secs();

pub const DEFAULT_TILE_MAX_SIZE: u64 = tile::DEFAULT_MAX_SIZE_BYTES;
pub const DEFAULT_TILE_MIN_SIZE: u64 = tile::DEFAULT_MIN_SIZE_BYTES;
pub const DEFAULT_TILE_LARGEST_CACHEABLE_SIZE: u64 = tile::DEFAULT_LARGEST_CACHEABLE_SIZE;
pub const DEFAULT_TILE_MAX_AGE_SECS: u64 = tile::DEFAULT_MAX_AGE.as_secs();

/// Default directory for stored query files (`<cache dir>/biocache-cache/qid`).
pub fn default_qid_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("biocache-cache")
        .join("qid")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            qid: QidSettings {
                directory: default_qid_directory(),
                max_entries: DEFAULT_QID_MAX_ENTRIES,
                min_entries: DEFAULT_QID_MIN_ENTRIES,
                max_size: DEFAULT_QID_MAX_SIZE,
                min_size: DEFAULT_QID_MIN_SIZE,
                largest_cacheable_size: DEFAULT_QID_LARGEST_CACHEABLE_SIZE,
                max_file_age_secs: DEFAULT_QID_MAX_FILE_AGE_SECS,
                cleaner_batch: DEFAULT_QID_CLEANER_BATCH,
                reap_interval_secs: DEFAULT_QID_REAP_INTERVAL_SECS,
            },
            tile: TileSettings {
                max_size: DEFAULT_TILE_MAX_SIZE,
                min_size: DEFAULT_TILE_MIN_SIZE,
                largest_cacheable_size: DEFAULT_TILE_LARGEST_CACHEABLE_SIZE,
                max_age_secs: DEFAULT_TILE_MAX_AGE_SECS,
            },
            logging: LoggingSettings {
                directory: super::file::config_directory().join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
