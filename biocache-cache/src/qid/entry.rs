//! Query cache entries and their stored form.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::size::query_entry_size;

/// Search parameters to be stored under a qid.
///
/// # Example
///
/// ```
/// use biocache_cache::qid::QueryParams;
///
/// let params = QueryParams::new("lsid:123")
///     .with_display_query("Acacia dealbata")
///     .with_wkt("POLYGON((110 -45,157 -45,157 -9,110 -9,110 -45))")
///     .with_bbox([110.0, -45.0, 157.0, -9.0])
///     .with_filter("state:Victoria");
///
/// assert_eq!(params.filters, vec!["state:Victoria".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    /// Raw search query
    pub query: String,
    /// Human-readable rendering of the query
    pub display_query: String,
    /// Well-known-text geometry restricting the search
    pub wkt: String,
    /// Bounding box as `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: Option<[f64; 4]>,
    /// Filter query terms
    pub filters: Vec<String>,
}

impl QueryParams {
    /// Create parameters for a query with no display string, geometry or filters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_display_query(mut self, display_query: impl Into<String>) -> Self {
        self.display_query = display_query.into();
        self
    }

    pub fn with_wkt(mut self, wkt: impl Into<String>) -> Self {
        self.wkt = wkt.into();
        self
    }

    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Approximate cost of an entry holding these parameters.
    pub fn size_bytes(&self) -> u64 {
        query_entry_size(
            &self.query,
            &self.display_query,
            &self.wkt,
            self.bbox.is_some(),
            &self.filters,
        )
    }
}

/// Serialized form of a query entry in secondary storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuery {
    pub key: u64,
    pub query: String,
    #[serde(default)]
    pub display_query: String,
    #[serde(default)]
    pub wkt: String,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// A query stored under a qid.
///
/// Shared as `Arc<QueryCacheEntry>` between the resident map and callers;
/// only the last-use timestamp changes after creation.
#[derive(Debug)]
pub struct QueryCacheEntry {
    key: u64,
    params: QueryParams,
    size_bytes: u64,
    last_use: AtomicU64,
}

impl QueryCacheEntry {
    /// Create an entry last used at `now`.
    pub fn new(key: u64, params: QueryParams, now: u64) -> Self {
        let size_bytes = params.size_bytes();
        Self {
            key,
            params,
            size_bytes,
            last_use: AtomicU64::new(now),
        }
    }

    /// Rebuild an entry read back from secondary storage.
    pub fn from_stored(stored: StoredQuery, now: u64) -> Self {
        let params = QueryParams {
            query: stored.query,
            display_query: stored.display_query,
            wkt: stored.wkt,
            bbox: stored.bbox,
            filters: stored.filters,
        };
        Self::new(stored.key, params, now)
    }

    /// Stored form of this entry.
    pub fn to_stored(&self) -> StoredQuery {
        StoredQuery {
            key: self.key,
            query: self.params.query.clone(),
            display_query: self.params.display_query.clone(),
            wkt: self.params.wkt.clone(),
            bbox: self.params.bbox,
            filters: self.params.filters.clone(),
        }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn query(&self) -> &str {
        &self.params.query
    }

    pub fn display_query(&self) -> &str {
        &self.params.display_query
    }

    pub fn wkt(&self) -> &str {
        &self.params.wkt
    }

    pub fn bbox(&self) -> Option<[f64; 4]> {
        self.params.bbox
    }

    pub fn filters(&self) -> &[String] {
        &self.params.filters
    }

    /// All stored parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Approximate in-memory cost, fixed at creation.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Last use in milliseconds since the Unix epoch.
    pub fn last_use(&self) -> u64 {
        self.last_use.load(Ordering::Relaxed)
    }

    /// Record a use at `now`. Never moves the timestamp backwards.
    pub fn touch(&self, now: u64) {
        self.last_use.fetch_max(now, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acacia() -> QueryParams {
        QueryParams::new("lsid:123")
            .with_display_query("Acacia dealbata")
            .with_wkt("POLYGON((110 -45,157 -45,157 -9,110 -9,110 -45))")
            .with_bbox([110.0, -45.0, 157.0, -9.0])
    }

    #[test]
    fn test_entry_accessors() {
        let entry = QueryCacheEntry::new(7, acacia(), 1_000);

        assert_eq!(entry.key(), 7);
        assert_eq!(entry.query(), "lsid:123");
        assert_eq!(entry.display_query(), "Acacia dealbata");
        assert!(entry.wkt().starts_with("POLYGON"));
        assert_eq!(entry.bbox(), Some([110.0, -45.0, 157.0, -9.0]));
        assert!(entry.filters().is_empty());
        assert_eq!(entry.last_use(), 1_000);
        assert_eq!(entry.size_bytes(), acacia().size_bytes());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let entry = QueryCacheEntry::new(1, QueryParams::new("q"), 1_000);
        entry.touch(2_000);
        assert_eq!(entry.last_use(), 2_000);
        entry.touch(1_500);
        assert_eq!(entry.last_use(), 2_000);
    }

    #[test]
    fn test_stored_form_preserves_fields() {
        let params = acacia().with_filter("year:2010");
        let entry = QueryCacheEntry::new(99, params.clone(), 1_000);

        let json = serde_json::to_string(&entry.to_stored()).unwrap();
        let stored: StoredQuery = serde_json::from_str(&json).unwrap();
        let restored = QueryCacheEntry::from_stored(stored, 5_000);

        assert_eq!(restored.key(), 99);
        assert_eq!(restored.params(), &params);
        assert_eq!(restored.size_bytes(), entry.size_bytes());
        assert_eq!(restored.last_use(), 5_000);
    }

    #[test]
    fn test_stored_form_tolerates_missing_optional_fields() {
        let stored: StoredQuery = serde_json::from_str(r#"{"key":5,"query":"q"}"#).unwrap();
        assert_eq!(stored.display_query, "");
        assert_eq!(stored.bbox, None);
        assert!(stored.filters.is_empty());
    }
}
