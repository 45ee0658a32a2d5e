//! Secondary storage for query entries evicted from memory.
//!
//! Every entry is written through to the store when it is created, so the
//! store is the authoritative copy until the reaper deletes it. Keys embed
//! their creation time in epoch milliseconds, which is what
//! [`QueryStore::delete_older_than`] compares against.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::entry::StoredQuery;

/// Prefix of every stored query file.
pub const FILE_PREFIX: &str = "qid_";

/// Extension of every stored query file.
pub const FILE_EXTENSION: &str = "json";

/// Secondary storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error reading or writing the store
    #[error("Query store I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored entry could not be encoded or decoded
    #[error("Query store serialization error for qid {key}: {source}")]
    Serde {
        key: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Keyed storage for query entries.
///
/// Implementations must be safe to call from many threads; the qid cache
/// never holds one of its own locks while calling into the store.
pub trait QueryStore: Send + Sync {
    /// Persist an entry under its key, replacing any previous value.
    fn save(&self, entry: &StoredQuery) -> Result<(), StoreError>;

    /// Read an entry back. A missing key is `Ok(None)`.
    fn load(&self, key: u64) -> Result<Option<StoredQuery>, StoreError>;

    /// Delete every entry whose key is below `cutoff`.
    ///
    /// Returns the number of entries deleted.
    fn delete_older_than(&self, cutoff: u64) -> Result<usize, StoreError>;

    /// All stored keys, ascending.
    fn keys(&self) -> Result<Vec<u64>, StoreError>;
}

/// File name for a stored key (e.g. `qid_1380082337371.json`).
pub fn file_name(key: u64) -> String {
    format!("{}{}.{}", FILE_PREFIX, key, FILE_EXTENSION)
}

/// Parse the key out of a stored file name.
///
/// Returns `None` for anything that is not a stored query file.
pub fn parse_file_name(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Directory of JSON files, one per key.
///
/// Writes go to a temporary file that is renamed into place, so a concurrent
/// reader sees either the whole entry or no entry.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `directory`, creating it if needed.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: u64) -> PathBuf {
        self.directory.join(file_name(key))
    }

    /// Total bytes used by stored query files.
    pub fn disk_usage(&self) -> Result<u64, StoreError> {
        let mut total = 0;
        for (_, path) in self.stored_files()? {
            if let Ok(metadata) = fs::metadata(&path) {
                total += metadata.len();
            }
        }
        Ok(total)
    }

    fn stored_files(&self) -> Result<Vec<(u64, PathBuf)>, StoreError> {
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.directory)? {
            let dir_entry = match dir_entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let name = dir_entry.file_name();
            if let Some(key) = name.to_str().and_then(parse_file_name) {
                files.push((key, dir_entry.path()));
            }
        }
        Ok(files)
    }
}

impl QueryStore for FileStore {
    fn save(&self, entry: &StoredQuery) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entry).map_err(|source| StoreError::Serde {
            key: entry.key,
            source,
        })?;

        let path = self.path_for(entry.key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            // The reaper only lists `.json` files
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn load(&self, key: u64) -> Result<Option<StoredQuery>, StoreError> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Serde { key, source })
    }

    fn delete_older_than(&self, cutoff: u64) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for (key, path) in self.stored_files()? {
            if key >= cutoff {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    debug!(qid = key, "Removed expired query file");
                }
                Err(e) => {
                    // Another reaper or an operator may have got there first
                    debug!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove expired query file"
                    );
                }
            }
        }
        Ok(deleted)
    }

    fn keys(&self) -> Result<Vec<u64>, StoreError> {
        let mut keys: Vec<u64> = self.stored_files()?.into_iter().map(|(k, _)| k).collect();
        keys.sort_unstable();
        Ok(keys)
    }
}

/// In-memory store, for tests and for embedding without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<u64, StoredQuery>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl QueryStore for MemoryStore {
    fn save(&self, entry: &StoredQuery) -> Result<(), StoreError> {
        self.entries.lock().insert(entry.key, entry.clone());
        Ok(())
    }

    fn load(&self, key: u64) -> Result<Option<StoredQuery>, StoreError> {
        Ok(self.entries.lock().get(&key).cloned())
    }

    fn delete_older_than(&self, cutoff: u64) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock();
        let kept = entries.split_off(&cutoff);
        let deleted = entries.len();
        *entries = kept;
        Ok(deleted)
    }

    fn keys(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self.entries.lock().keys().copied().collect())
    }
}
