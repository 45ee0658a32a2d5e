//! Least-recently-used victim selection shared by both caches.
//!
//! Callers take a snapshot of their resident entries, hand it to
//! [`select_victims`], then remove the victims themselves. The snapshot may
//! already be stale by the time the victims are removed; a `last_use` touch
//! that lands mid-sweep may or may not be honoured.

/// A resident entry considered for eviction.
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionCandidate<K> {
    /// Cache key.
    pub key: K,
    /// Last use, in milliseconds since the Unix epoch.
    pub last_use: u64,
    /// Size charged to the cache for this entry.
    pub size_bytes: u64,
}

impl<K> EvictionCandidate<K> {
    /// Create a new candidate.
    pub fn new(key: K, last_use: u64, size_bytes: u64) -> Self {
        Self {
            key,
            last_use,
            size_bytes,
        }
    }
}

/// Bounds the resident set must be reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepTarget {
    /// Maximum entry count after the sweep, if count-bounded.
    pub max_entries: Option<usize>,
    /// Maximum aggregate size after the sweep.
    pub max_bytes: u64,
}

impl SweepTarget {
    /// Target bounded only by aggregate size.
    pub fn bytes(max_bytes: u64) -> Self {
        Self {
            max_entries: None,
            max_bytes,
        }
    }

    /// Target bounded by both entry count and aggregate size.
    pub fn entries_and_bytes(max_entries: usize, max_bytes: u64) -> Self {
        Self {
            max_entries: Some(max_entries),
            max_bytes,
        }
    }

    fn satisfied_by(&self, entries: usize, bytes: u64) -> bool {
        bytes <= self.max_bytes && self.max_entries.is_none_or(|max| entries <= max)
    }
}

/// Select the entries to evict, oldest first.
///
/// Sorts the snapshot by ascending `last_use` and takes entries from the
/// front until what remains satisfies `target`. Ties keep snapshot order.
pub fn select_victims<K>(
    mut candidates: Vec<EvictionCandidate<K>>,
    target: SweepTarget,
) -> Vec<EvictionCandidate<K>> {
    let mut remaining_entries = candidates.len();
    let mut remaining_bytes: u64 = candidates.iter().map(|c| c.size_bytes).sum();

    if target.satisfied_by(remaining_entries, remaining_bytes) {
        return Vec::new();
    }

    candidates.sort_by_key(|c| c.last_use);

    let mut victims = Vec::new();
    for candidate in candidates {
        if target.satisfied_by(remaining_entries, remaining_bytes) {
            break;
        }
        remaining_entries -= 1;
        remaining_bytes = remaining_bytes.saturating_sub(candidate.size_bytes);
        victims.push(candidate);
    }

    victims
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(key: u32, last_use: u64, size: u64) -> EvictionCandidate<u32> {
        EvictionCandidate::new(key, last_use, size)
    }

    #[test]
    fn test_nothing_to_do_under_target() {
        let victims = select_victims(
            vec![candidate(1, 10, 100), candidate(2, 20, 100)],
            SweepTarget::bytes(200),
        );
        assert!(victims.is_empty());
    }

    #[test]
    fn test_evicts_oldest_first_by_bytes() {
        let victims = select_victims(
            vec![
                candidate(1, 30, 100),
                candidate(2, 10, 100),
                candidate(3, 20, 100),
            ],
            SweepTarget::bytes(150),
        );

        let keys: Vec<u32> = victims.iter().map(|v| v.key).collect();
        assert_eq!(keys, vec![2, 3]);
    }

    #[test]
    fn test_evicts_to_entry_floor() {
        let snapshot = (0..10).map(|i| candidate(i, 100 - i as u64, 1)).collect();
        let victims = select_victims(snapshot, SweepTarget::entries_and_bytes(5, u64::MAX));

        let mut keys: Vec<u32> = victims.iter().map(|v| v.key).collect();
        keys.sort();
        // Highest keys have the oldest last_use
        assert_eq!(keys, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_both_bounds_apply() {
        // Count floor reached after one eviction, byte floor needs two
        let victims = select_victims(
            vec![
                candidate(1, 1, 500),
                candidate(2, 2, 500),
                candidate(3, 3, 10),
            ],
            SweepTarget::entries_and_bytes(2, 100),
        );
        assert_eq!(victims.len(), 2);
    }

    #[test]
    fn test_zero_sized_placeholders_stop_at_target() {
        let victims = select_victims(
            vec![candidate(1, 1, 0), candidate(2, 2, 300), candidate(3, 3, 0)],
            SweepTarget::bytes(0),
        );
        let keys: Vec<u32> = victims.iter().map(|v| v.key).collect();
        assert_eq!(keys, vec![1, 2]);
    }

    proptest! {
        #[test]
        fn prop_remaining_meets_target(
            sizes in proptest::collection::vec((0u64..1_000, 0u64..1_000), 0..64),
            max_bytes in 0u64..20_000,
            max_entries in 0usize..64,
        ) {
            let snapshot: Vec<_> = sizes
                .iter()
                .enumerate()
                .map(|(i, (last_use, size))| candidate(i as u32, *last_use, *size))
                .collect();
            let total: u64 = snapshot.iter().map(|c| c.size_bytes).sum();
            let count = snapshot.len();

            let target = SweepTarget::entries_and_bytes(max_entries, max_bytes);
            let victims = select_victims(snapshot, target);

            let freed: u64 = victims.iter().map(|v| v.size_bytes).sum();
            prop_assert!(total - freed <= max_bytes);
            prop_assert!(count - victims.len() <= max_entries);

            // Victims come out oldest first
            for pair in victims.windows(2) {
                prop_assert!(pair[0].last_use <= pair[1].last_use);
            }
        }
    }
}
