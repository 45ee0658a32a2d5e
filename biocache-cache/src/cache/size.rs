//! Approximate in-memory cost of cache entries.
//!
//! These are estimates, not allocator-exact figures. They only have to be
//! consistent: the same entry always costs the same, and larger payloads
//! always cost more. Admission control and the water marks of both caches
//! are expressed in these units.
//!
//! # Query entries
//!
//! | Field            | Cost                                    |
//! |------------------|-----------------------------------------|
//! | `query`          | UTF-8 byte length                       |
//! | `display_query`  | UTF-8 byte length                       |
//! | `wkt`            | UTF-8 byte length                       |
//! | `bbox`           | 32 when present, 0 otherwise            |
//! | each filter term | UTF-8 byte length + 24 (string header)  |
//! | bookkeeping      | 24 (key, last use, size)                |
//!
//! # Tile entries
//!
//! | Field            | Cost                                    |
//! |------------------|-----------------------------------------|
//! | `points`         | 8 per point (`[f32; 2]`)                |
//! | `counts`         | 4 per count value                       |
//! | `colours`        | 4 per colour                            |
//! | `query`          | UTF-8 byte length                       |
//! | `colour_mode`    | UTF-8 byte length                       |
//! | `bbox`           | 32                                      |
//! | bookkeeping      | 25 (created, last use, size, cached)    |
//!
//! Before a tile is computed its strings and colours are unknown, so
//! [`tile_size_estimate`] substitutes fixed allowances for them.

/// Cost of an optional `[f64; 4]` bounding box.
pub const BBOX_BYTES: u64 = 4 * 8;

/// Key, last-use timestamp and size of a query entry.
pub const QUERY_BOOKKEEPING_BYTES: u64 = 8 + 8 + 8;

/// Per-term overhead of a filter query string.
pub const FILTER_TERM_OVERHEAD_BYTES: u64 = 24;

/// Created and last-use timestamps, size and cached flag of a tile entry.
pub const TILE_BOOKKEEPING_BYTES: u64 = 8 + 8 + 8 + 1;

/// Bytes per stored point.
pub const POINT_BYTES: u64 = 2 * 4;

/// Bytes per stored occurrence count.
pub const COUNT_BYTES: u64 = 4;

/// Bytes per stored colour.
pub const COLOUR_BYTES: u64 = 4;

/// Allowance for the query string of a tile not yet computed.
pub const QUERY_ALLOWANCE_BYTES: u64 = 250;

/// Allowance for the colour mode of a tile not yet computed.
pub const COLOUR_MODE_ALLOWANCE_BYTES: u64 = 15;

/// Allowance for the colour table of a tile not yet computed.
pub const COLOURS_ALLOWANCE_BYTES: u64 = 4 * COLOUR_BYTES;

/// Cost of a query cache entry.
pub fn query_entry_size<S: AsRef<str>>(
    query: &str,
    display_query: &str,
    wkt: &str,
    has_bbox: bool,
    filters: &[S],
) -> u64 {
    let strings = (query.len() + display_query.len() + wkt.len()) as u64;
    let bbox = if has_bbox { BBOX_BYTES } else { 0 };
    let filters: u64 = filters
        .iter()
        .map(|f| f.as_ref().len() as u64 + FILTER_TERM_OVERHEAD_BYTES)
        .sum();

    strings + bbox + filters + QUERY_BOOKKEEPING_BYTES
}

/// Cost of a fully populated tile entry.
///
/// `point_count` and `count_values` are totals across all segments.
pub fn tile_entry_size(
    query: &str,
    colour_mode: &str,
    point_count: usize,
    count_values: usize,
    colour_count: usize,
) -> u64 {
    point_count as u64 * POINT_BYTES
        + count_values as u64 * COUNT_BYTES
        + colour_count as u64 * COLOUR_BYTES
        + query.len() as u64
        + colour_mode.len() as u64
        + BBOX_BYTES
        + TILE_BOOKKEEPING_BYTES
}

/// Estimated cost of a tile before it is computed.
///
/// Used as a pre-check so callers can skip expensive work whose result
/// could never be cached.
pub fn tile_size_estimate(point_count: usize, has_counts: bool) -> u64 {
    let per_point = POINT_BYTES + if has_counts { COUNT_BYTES } else { 0 };

    point_count as u64 * per_point
        + BBOX_BYTES
        + TILE_BOOKKEEPING_BYTES
        + QUERY_ALLOWANCE_BYTES
        + COLOUR_MODE_ALLOWANCE_BYTES
        + COLOURS_ALLOWANCE_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_query_entry_size_counts_utf8_bytes() {
        let no_filters: [&str; 0] = [];
        // "é" is two bytes in UTF-8
        let size = query_entry_size("é", "", "", false, &no_filters);
        assert_eq!(size, 2 + QUERY_BOOKKEEPING_BYTES);
    }

    #[test]
    fn test_query_entry_size_bbox_and_filters() {
        let filters = ["state:ACT", "year:2010"];
        let without = query_entry_size("q", "d", "w", false, &filters);
        let with = query_entry_size("q", "d", "w", true, &filters);

        assert_eq!(with - without, BBOX_BYTES);
        assert_eq!(
            without,
            3 + 9 + 9 + 2 * FILTER_TERM_OVERHEAD_BYTES + QUERY_BOOKKEEPING_BYTES
        );
    }

    #[test]
    fn test_tile_entry_size_empty() {
        assert_eq!(
            tile_entry_size("", "", 0, 0, 0),
            BBOX_BYTES + TILE_BOOKKEEPING_BYTES
        );
    }

    #[test]
    fn test_tile_entry_size_per_field() {
        let size = tile_entry_size("lsid:1", "grid", 10, 10, 2);
        assert_eq!(
            size,
            10 * POINT_BYTES + 10 * COUNT_BYTES + 2 * COLOUR_BYTES + 6 + 4 + BBOX_BYTES
                + TILE_BOOKKEEPING_BYTES
        );
    }

    #[test]
    fn test_tile_size_estimate_counts_cost_more() {
        assert!(tile_size_estimate(100, true) > tile_size_estimate(100, false));
        assert_eq!(
            tile_size_estimate(100, true) - tile_size_estimate(100, false),
            100 * COUNT_BYTES
        );
    }

    proptest! {
        #[test]
        fn prop_estimate_covers_small_tiles(
            points in 0usize..10_000,
            has_counts in any::<bool>(),
            query_len in 0usize..=250,
            mode_len in 0usize..=15,
            colours in 0usize..=4,
        ) {
            let query = "q".repeat(query_len);
            let mode = "m".repeat(mode_len);
            let counts = if has_counts { points } else { 0 };

            let exact = tile_entry_size(&query, &mode, points, counts, colours);
            prop_assert!(tile_size_estimate(points, has_counts) >= exact);
        }

        #[test]
        fn prop_query_size_grows_with_query(base in ".{0,64}", extra in ".{1,64}") {
            let no_filters: [&str; 0] = [];
            let longer = format!("{}{}", base, extra);
            prop_assert!(
                query_entry_size(&longer, "", "", false, &no_filters)
                    > query_entry_size(&base, "", "", false, &no_filters)
            );
        }
    }
}
