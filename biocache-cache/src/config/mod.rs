//! Configuration file handling for `~/.biocache-cache/config.ini`.
//!
//! - [`settings`] - one struct per INI section
//! - [`defaults`] - default values and `ConfigFile::default()`
//! - [`file`] - loading and saving
//! - [`keys`] - typed get/set by `section.key` name
//!
//! # Example
//!
//! ```
//! use biocache_cache::config::{ConfigFile, ConfigKey};
//!
//! let mut config = ConfigFile::default();
//! let key: ConfigKey = "qid.max_entries".parse().unwrap();
//! key.set(&mut config, "20").unwrap();
//!
//! assert_eq!(config.qid.max_entries, 20);
//! assert_eq!(config.qid.to_cache_config().max_entries, 20);
//! ```

pub mod defaults;
mod file;
mod keys;
mod parser;
pub mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{ConfigFile, LoggingSettings, QidSettings, TileSettings};
pub use size::{format_size, parse_size, Size, SizeParseError};
