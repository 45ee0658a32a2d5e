//! Building blocks shared by the qid and tile caches.
//!
//! - [`size`] - approximate byte cost of entries
//! - [`lru`] - oldest-first victim selection over a snapshot
//! - [`gate`] - counting gate that wakes a cleaner thread
//! - [`stats`] - hot-path counters and snapshots
//!
//! The caches themselves live in [`crate::qid`] and [`crate::tile`].

pub mod gate;
pub mod lru;
pub mod size;
mod stats;

pub use gate::{CleanerGate, GateSignal};
pub use lru::{select_victims, EvictionCandidate, SweepTarget};
pub use stats::{CacheCounters, CacheStats};

/// Size at which a cleaner is triggered: half way between the low and high
/// water marks.
pub fn trigger_size(min_size_bytes: u64, max_size_bytes: u64) -> u64 {
    min_size_bytes + max_size_bytes.saturating_sub(min_size_bytes) / 2
}
