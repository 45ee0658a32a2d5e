//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and opening the
//! query cache, so command handlers only deal with their own work.

use crate::error::CliError;
use biocache_cache::config::ConfigFile;
use biocache_cache::logging::{init_from_settings, LoggingGuard};
use biocache_cache::qid::{FileStore, QueryParamCache};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize file logging.
    ///
    /// Stdout logging stays off; commands print their results there.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_guard = init_from_settings(&config.logging, false)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("biocache-cache v{}", biocache_cache::VERSION);
        info!("biocache-cache CLI: {} command", command);
    }

    /// Open the query cache over the configured directory.
    pub fn query_cache(&self) -> Result<QueryParamCache, CliError> {
        let settings = &self.config.qid;
        let cache =
            QueryParamCache::with_directory(settings.to_cache_config(), settings.directory.clone())?;
        Ok(cache)
    }

    /// Open the configured store directory without starting a cache.
    pub fn file_store(&self) -> Result<FileStore, CliError> {
        Ok(FileStore::new(self.config.qid.directory.clone())?)
    }
}
