//! Query parameter cache ("qid cache").
//!
//! Stores search parameters under a short numeric id so clients can refer to
//! a long query as `qid:<id>`. Resident entries are bounded by count and by
//! size; everything is written through to a [`QueryStore`] and reaped after
//! the maximum file age.

mod cache;
mod config;
mod entry;
mod error;
mod keygen;
mod pattern;
pub mod store;

pub use cache::{QueryParamCache, ReapSummary, CLEANER_THREAD_NAME};
pub use config::{
    QidCacheConfig, DEFAULT_CLEANER_BATCH, DEFAULT_LARGEST_CACHEABLE_SIZE, DEFAULT_MAX_ENTRIES,
    DEFAULT_MAX_FILE_AGE, DEFAULT_MAX_SIZE_BYTES, DEFAULT_MIN_ENTRIES, DEFAULT_MIN_SIZE_BYTES,
    DEFAULT_REAP_INTERVAL,
};
pub use entry::{QueryCacheEntry, QueryParams, StoredQuery};
pub use error::QidCacheError;
pub use keygen::KeyGenerator;
pub use pattern::parse_qid;
pub use store::{FileStore, MemoryStore, QueryStore, StoreError};
