//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use biocache_cache::config::ConfigFileError;
use biocache_cache::qid::{QidCacheError, StoreError};
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to open or use the query cache
    QueryCache(QidCacheError),
    /// Failed to read the query store directly
    Store(StoreError),
    /// A qid argument could not be parsed
    InvalidQid(String),
    /// No stored query for this qid
    NotFound(u64),
    /// Failed to render output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::NotFound(_) => {
                eprintln!();
                eprintln!("The query may have expired and been reaped, or was stored");
                eprintln!("under a different directory. Check 'qid.directory' with:");
                eprintln!("  biocache-cache config get qid.directory");
            }
            CliError::InvalidQid(_) => {
                eprintln!();
                eprintln!("Pass either a number (1700000000000) or a qid term (qid:1700000000000).");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::QueryCache(e) => write!(f, "Query cache error: {}", e),
            CliError::Store(e) => write!(f, "Query store error: {}", e),
            CliError::InvalidQid(arg) => write!(f, "Not a qid: '{}'", arg),
            CliError::NotFound(qid) => write!(f, "No stored query for qid {}", qid),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::QueryCache(e) => Some(e),
            CliError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<QidCacheError> for CliError {
    fn from(e: QidCacheError) -> Self {
        CliError::QueryCache(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CliError::NotFound(42).to_string(),
            "No stored query for qid 42"
        );
        assert_eq!(
            CliError::InvalidQid("abc".to_string()).to_string(),
            "Not a qid: 'abc'"
        );
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err = CliError::from(QidCacheError::Missing(7));
        assert!(err.source().is_some());
        assert!(CliError::Config("bad".to_string()).source().is_none());
    }
}
