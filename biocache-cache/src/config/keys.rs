//! Configuration key access and validation.
//!
//! Gets and sets configuration values by `section.key` name, validating each
//! value against the key's value format before it is stored.

use std::str::FromStr;
use thiserror::Error;

use super::parser::{expand_tilde, path_to_display};
use super::settings::ConfigFile;
use super::size::{format_size, parse_size};

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
///
/// Each key maps to a field of [`ConfigFile`] and knows how to get and set
/// its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    // Query cache settings
    QidDirectory,
    QidMaxEntries,
    QidMinEntries,
    QidMaxSize,
    QidMinSize,
    QidLargestCacheableSize,
    QidMaxFileAgeSecs,
    QidCleanerBatch,
    QidReapIntervalSecs,

    // Tile cache settings
    TileMaxSize,
    TileMinSize,
    TileLargestCacheableSize,
    TileMaxAgeSecs,

    // Logging settings
    LoggingDirectory,
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == lower)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Canonical key name (e.g. "qid.max_entries").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::QidDirectory => "qid.directory",
            ConfigKey::QidMaxEntries => "qid.max_entries",
            ConfigKey::QidMinEntries => "qid.min_entries",
            ConfigKey::QidMaxSize => "qid.max_size",
            ConfigKey::QidMinSize => "qid.min_size",
            ConfigKey::QidLargestCacheableSize => "qid.largest_cacheable_size",
            ConfigKey::QidMaxFileAgeSecs => "qid.max_file_age_secs",
            ConfigKey::QidCleanerBatch => "qid.cleaner_batch",
            ConfigKey::QidReapIntervalSecs => "qid.reap_interval_secs",
            ConfigKey::TileMaxSize => "tile.max_size",
            ConfigKey::TileMinSize => "tile.min_size",
            ConfigKey::TileLargestCacheableSize => "tile.largest_cacheable_size",
            ConfigKey::TileMaxAgeSecs => "tile.max_age_secs",
            ConfigKey::LoggingDirectory => "logging.directory",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Section name (e.g. "qid").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Key name within the section (e.g. "max_entries").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        let qid = &config.qid;
        let tile = &config.tile;
        match self {
            ConfigKey::QidDirectory => path_to_display(&qid.directory),
            ConfigKey::QidMaxEntries => qid.max_entries.to_string(),
            ConfigKey::QidMinEntries => qid.min_entries.to_string(),
            ConfigKey::QidMaxSize => format_size(qid.max_size),
            ConfigKey::QidMinSize => format_size(qid.min_size),
            ConfigKey::QidLargestCacheableSize => format_size(qid.largest_cacheable_size),
            ConfigKey::QidMaxFileAgeSecs => qid.max_file_age_secs.to_string(),
            ConfigKey::QidCleanerBatch => qid.cleaner_batch.to_string(),
            ConfigKey::QidReapIntervalSecs => qid.reap_interval_secs.to_string(),
            ConfigKey::TileMaxSize => format_size(tile.max_size),
            ConfigKey::TileMinSize => format_size(tile.min_size),
            ConfigKey::TileLargestCacheableSize => format_size(tile.largest_cacheable_size),
            ConfigKey::TileMaxAgeSecs => tile.max_age_secs.to_string(),
            ConfigKey::LoggingDirectory => path_to_display(&config.logging.directory),
            ConfigKey::LoggingFile => config.logging.file.clone(),
        }
    }

    /// Set the value in a config file.
    ///
    /// Validates the value according to the key's value format first.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        let value = value.trim();
        let failed = |reason: String| ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason,
        };

        match self.value_spec() {
            ValueSpec::Size => {
                let bytes = parse_size(value)
                    .map_err(|_| failed("must be a size like '100MB', '5MB', or '512KB'".into()))?;
                match self {
                    ConfigKey::QidMaxSize => config.qid.max_size = bytes,
                    ConfigKey::QidMinSize => config.qid.min_size = bytes,
                    ConfigKey::QidLargestCacheableSize => {
                        config.qid.largest_cacheable_size = bytes
                    }
                    ConfigKey::TileMaxSize => config.tile.max_size = bytes,
                    ConfigKey::TileMinSize => config.tile.min_size = bytes,
                    ConfigKey::TileLargestCacheableSize => {
                        config.tile.largest_cacheable_size = bytes
                    }
                    _ => unreachable!("{} is not a size key", self.name()),
                }
            }
            ValueSpec::Integer => {
                let n: u64 = value
                    .parse()
                    .map_err(|_| failed("must be a non-negative integer".into()))?;
                let as_count =
                    || usize::try_from(n).map_err(|_| failed("value is too large".into()));
                match self {
                    ConfigKey::QidMaxEntries => config.qid.max_entries = as_count()?,
                    ConfigKey::QidMinEntries => config.qid.min_entries = as_count()?,
                    ConfigKey::QidMaxFileAgeSecs => config.qid.max_file_age_secs = n,
                    ConfigKey::QidCleanerBatch => config.qid.cleaner_batch = as_count()?,
                    ConfigKey::QidReapIntervalSecs => config.qid.reap_interval_secs = n,
                    ConfigKey::TileMaxAgeSecs => config.tile.max_age_secs = n,
                    _ => unreachable!("{} is not an integer key", self.name()),
                }
            }
            ValueSpec::Path => {
                if value.is_empty() {
                    return Err(failed("must be a valid path".into()));
                }
                match self {
                    ConfigKey::QidDirectory => config.qid.directory = expand_tilde(value),
                    ConfigKey::LoggingDirectory => config.logging.directory = expand_tilde(value),
                    _ => unreachable!("{} is not a path key", self.name()),
                }
            }
            ValueSpec::FileName => {
                if value.is_empty() || value.contains('/') {
                    return Err(failed("must be a file name without directories".into()));
                }
                config.logging.file = value.to_string();
            }
        }
        Ok(())
    }

    /// Check a value against this key's value format without storing it.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        let mut scratch = ConfigFile::default();
        self.set(&mut scratch, value)
    }

    fn value_spec(&self) -> ValueSpec {
        match self {
            ConfigKey::QidMaxSize
            | ConfigKey::QidMinSize
            | ConfigKey::QidLargestCacheableSize
            | ConfigKey::TileMaxSize
            | ConfigKey::TileMinSize
            | ConfigKey::TileLargestCacheableSize => ValueSpec::Size,
            ConfigKey::QidMaxEntries
            | ConfigKey::QidMinEntries
            | ConfigKey::QidMaxFileAgeSecs
            | ConfigKey::QidCleanerBatch
            | ConfigKey::QidReapIntervalSecs
            | ConfigKey::TileMaxAgeSecs => ValueSpec::Integer,
            ConfigKey::QidDirectory | ConfigKey::LoggingDirectory => ValueSpec::Path,
            ConfigKey::LoggingFile => ValueSpec::FileName,
        }
    }

    /// All supported configuration keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::QidDirectory,
            ConfigKey::QidMaxEntries,
            ConfigKey::QidMinEntries,
            ConfigKey::QidMaxSize,
            ConfigKey::QidMinSize,
            ConfigKey::QidLargestCacheableSize,
            ConfigKey::QidMaxFileAgeSecs,
            ConfigKey::QidCleanerBatch,
            ConfigKey::QidReapIntervalSecs,
            ConfigKey::TileMaxSize,
            ConfigKey::TileMinSize,
            ConfigKey::TileLargestCacheableSize,
            ConfigKey::TileMaxAgeSecs,
            ConfigKey::LoggingDirectory,
            ConfigKey::LoggingFile,
        ]
    }
}

/// Kind of value a key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueSpec {
    /// Byte size with optional KB/MB/GB suffix
    Size,
    /// Non-negative integer
    Integer,
    /// Non-empty path, `~/` expanded
    Path,
    /// Bare file name
    FileName,
}
