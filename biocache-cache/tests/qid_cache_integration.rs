//! Integration tests for the query parameter cache.
//!
//! These tests exercise the cache through its public API:
//! - Key generation under concurrent puts
//! - Round-trips through memory and through the file store
//! - Aging and reaping of stored entries
//! - Resident bounds with the cleaner running

use biocache_cache::qid::{
    FileStore, QidCacheConfig, QidCacheError, QueryParamCache, QueryParams, QueryStore,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

const ACACIA_WKT: &str = "POLYGON((110 -45,157 -45,157 -9,110 -9,110 -45))";
const ACACIA_BBOX: [f64; 4] = [110.0, -45.0, 157.0, -9.0];

/// Config whose cleaner only wakes when a test asks it to.
fn quiet_config() -> QidCacheConfig {
    QidCacheConfig::default()
        .with_cleaner_batch(usize::MAX)
        .with_reap_interval(Duration::from_secs(3600))
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// =============================================================================
// Integration Tests
// =============================================================================

#[test]
fn test_concurrent_puts_get_distinct_increasing_keys() {
    let cache = Arc::new(QueryParamCache::in_memory(
        QidCacheConfig::default().with_entry_bounds(50, 25),
    ));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                (0..200)
                    .map(|i| {
                        cache
                            .put_params(QueryParams::new(format!("thread:{} n:{}", t, i)))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        let keys = handle.join().unwrap();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        all.extend(keys);
    }

    assert_eq!(all.len(), 1600);
    assert_eq!(cache.last_key(), *all.iter().max().unwrap());
}

#[test]
fn test_acacia_round_trip_then_expiry() {
    let temp_dir = TempDir::new().unwrap();
    let config = quiet_config().with_max_file_age(Duration::from_millis(300));
    let cache = QueryParamCache::with_directory(config, temp_dir.path()).unwrap();

    let qid = cache
        .put("lsid:123", "Acacia dealbata", ACACIA_WKT, Some(ACACIA_BBOX))
        .unwrap();

    let entry = cache.get(qid).unwrap();
    assert_eq!(entry.query(), "lsid:123");
    assert_eq!(entry.display_query(), "Acacia dealbata");
    assert_eq!(entry.wkt(), ACACIA_WKT);
    assert_eq!(entry.bbox(), Some(ACACIA_BBOX));
    assert!(temp_dir.path().join(format!("qid_{}.json", qid)).exists());

    thread::sleep(Duration::from_millis(400));
    let summary = cache.reap_expired();

    assert_eq!(summary.stored_deleted, 1);
    assert!(cache.get(qid).is_none());
    assert!(!temp_dir.path().join(format!("qid_{}.json", qid)).exists());
    assert!(matches!(
        cache.entry_for_query(&format!("qid:{}", qid)),
        Err(QidCacheError::Missing(k)) if k == qid
    ));
}

#[test]
fn test_expired_key_unreachable_before_reaper_runs() {
    let temp_dir = TempDir::new().unwrap();
    let config = quiet_config().with_max_file_age(Duration::from_millis(100));
    let cache = QueryParamCache::with_directory(config, temp_dir.path()).unwrap();
    let qid = cache.put_params(QueryParams::new("stale")).unwrap();

    cache.clear_resident();
    thread::sleep(Duration::from_millis(200));

    // The file is still there, but too old to be served
    assert!(temp_dir.path().join(format!("qid_{}.json", qid)).exists());
    assert!(cache.get(qid).is_none());
}

#[test]
fn test_round_trip_after_eviction_uses_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let cache = QueryParamCache::with_directory(
        quiet_config().with_entry_bounds(4, 2),
        temp_dir.path(),
    )
    .unwrap();

    let keys: Vec<u64> = (0..10)
        .map(|i| {
            let params = QueryParams::new(format!("q{}", i))
                .with_display_query(format!("query {}", i))
                .with_filter(format!("year:{}", 2000 + i));
            cache.put_params(params).unwrap()
        })
        .collect();

    cache.sweep();
    assert!(cache.resident_count() <= 2);

    for (i, key) in keys.iter().enumerate() {
        let entry = cache.get(*key).unwrap();
        assert_eq!(entry.query(), format!("q{}", i));
        assert_eq!(entry.display_query(), format!("query {}", i));
        assert_eq!(entry.filters(), &[format!("year:{}", 2000 + i)]);
    }
    assert!(cache.stats().store_hits >= 8);
}

#[test]
fn test_cleaner_keeps_resident_set_bounded() {
    let config = QidCacheConfig::default()
        .with_entry_bounds(10, 5)
        .with_reap_interval(Duration::from_secs(3600));
    let cache = Arc::new(QueryParamCache::in_memory(config));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..100 {
                    cache
                        .put_params(QueryParams::new(format!("t{} q{}", t, i)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || cache.resident_count() <= 10));
    assert!(cache.stats().evictions > 0);
    assert_eq!(cache.store().keys().unwrap().len(), 400);
}

#[test]
fn test_oversized_query_is_rejected() {
    let cache = QueryParamCache::in_memory(quiet_config().with_largest_cacheable_size(1024));
    let huge_wkt = "1 2,".repeat(1000);

    let result = cache.put("lsid:1", "", huge_wkt, None);

    assert!(matches!(
        result,
        Err(QidCacheError::TooLarge { limit: 1024, .. })
    ));
    assert!(cache.store().keys().unwrap().is_empty());
}

#[test]
fn test_file_store_ignores_foreign_files() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("README"), "not a query").unwrap();
    std::fs::write(temp_dir.path().join("qid_1.tmp"), "partial").unwrap();

    let store = FileStore::new(temp_dir.path()).unwrap();
    assert!(store.keys().unwrap().is_empty());
    assert_eq!(store.delete_older_than(u64::MAX).unwrap(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_round_trip_resident_and_stored(
        query in "\\PC{0,64}",
        display in "\\PC{0,64}",
        wkt in "\\PC{0,128}",
        bbox in proptest::option::of(proptest::array::uniform4(-180.0f64..180.0)),
    ) {
        let cache = QueryParamCache::in_memory(quiet_config());
        let qid = cache.put(query.clone(), display.clone(), wkt.clone(), bbox).unwrap();

        let resident = cache.get(qid).unwrap();
        prop_assert_eq!(resident.query(), query.as_str());
        prop_assert_eq!(resident.display_query(), display.as_str());
        prop_assert_eq!(resident.wkt(), wkt.as_str());
        prop_assert_eq!(resident.bbox(), bbox);

        cache.clear_resident();
        let stored = cache.get(qid).unwrap();
        prop_assert_eq!(stored.params(), resident.params());
    }

    #[test]
    fn prop_round_trip_through_file_store(
        query in "\\PC{0,64}",
        display in "\\PC{0,64}",
        wkt in "\\PC{0,128}",
        bbox in proptest::option::of(proptest::array::uniform4(-180.0f64..180.0)),
        filters in proptest::collection::vec("\\PC{0,32}", 0..4),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let cache = QueryParamCache::with_directory(quiet_config(), temp_dir.path()).unwrap();

        let mut params = QueryParams::new(query.clone())
            .with_display_query(display.clone())
            .with_wkt(wkt.clone());
        params.bbox = bbox;
        params.filters = filters.clone();
        let qid = cache.put_params(params).unwrap();

        // Force the read to come from disk
        cache.clear_resident();
        let stored = cache.get(qid).unwrap();

        prop_assert_eq!(stored.query(), query.as_str());
        prop_assert_eq!(stored.display_query(), display.as_str());
        prop_assert_eq!(stored.wkt(), wkt.as_str());
        let bits = |b: [f64; 4]| b.map(f64::to_bits);
        prop_assert_eq!(stored.bbox().map(bits), bbox.map(bits));
        prop_assert_eq!(stored.filters(), filters.as_slice());
        prop_assert_eq!(cache.stats().store_hits, 1);
    }
}
