//! Time-related utility functions.
//!
//! Both caches order entries by wall-clock milliseconds since the Unix epoch.
//! The qid cache also embeds that value in its keys, so it has to survive a
//! process restart, which rules out `Instant`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// A clock set before 1970 reads as zero rather than failing.
///
/// # Example
///
/// ```
/// use biocache_cache::time::now_millis;
///
/// let before = now_millis();
/// let after = now_millis();
/// assert!(after >= before);
/// ```
pub fn now_millis() -> u64 {
    system_time_to_millis(SystemTime::now())
}

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
pub fn system_time_to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds elapsed between `then` and `now`, saturating at zero.
///
/// Timestamps in the future (clock skew, or qid keys bumped past the clock)
/// count as zero elapsed.
pub fn elapsed_millis(then: u64, now: u64) -> u64 {
    now.saturating_sub(then)
}

/// Whether a timestamp is strictly older than `max_age` at `now`.
pub fn is_older_than(then: u64, max_age: Duration, now: u64) -> bool {
    elapsed_millis(then, now) > max_age.as_millis() as u64
}
