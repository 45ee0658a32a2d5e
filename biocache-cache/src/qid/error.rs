//! Query cache errors.

use thiserror::Error;

use super::store::StoreError;

/// Errors returned by the query cache.
///
/// A lookup that finds nothing is not an error; only [`QidCacheError::Missing`]
/// is raised, and only when a query text names a qid explicitly.
#[derive(Debug, Error)]
pub enum QidCacheError {
    /// Entry exceeds the per-entry ceiling
    #[error("Query entry of {size} bytes exceeds the cacheable limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// A query referenced a qid that is not cached
    #[error("No cached query for qid {0}")]
    Missing(u64),

    /// Secondary storage could not be opened
    #[error(transparent)]
    Store(#[from] StoreError),
}
