//! Monotonic qid generation.

use parking_lot::Mutex;

use crate::time::now_millis;

/// Issues strictly increasing keys seeded from the wall clock.
///
/// A key is the current epoch millisecond, unless that is not greater than
/// the previously issued key (clock skew, or several calls within one
/// millisecond), in which case it is `last + 1`. Keys therefore double as
/// approximate creation timestamps, which the store reaper relies on.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last: Mutex<u64>,
}

impl KeyGenerator {
    /// Create a generator that has not issued any keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next key.
    pub fn next_key(&self) -> u64 {
        self.next_key_at(now_millis())
    }

    /// Issue the next key given the current time.
    pub fn next_key_at(&self, now: u64) -> u64 {
        let mut last = self.last.lock();
        let next = if now <= *last { *last + 1 } else { now };
        *last = next;
        next
    }

    /// The most recently issued key, or zero.
    pub fn last_key(&self) -> u64 {
        *self.last.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_uses_clock_when_ahead() {
        let keys = KeyGenerator::new();
        assert_eq!(keys.next_key_at(1_000), 1_000);
        assert_eq!(keys.next_key_at(2_000), 2_000);
        assert_eq!(keys.last_key(), 2_000);
    }

    #[test]
    fn test_same_millisecond_increments() {
        let keys = KeyGenerator::new();
        assert_eq!(keys.next_key_at(1_000), 1_000);
        assert_eq!(keys.next_key_at(1_000), 1_001);
        assert_eq!(keys.next_key_at(1_000), 1_002);
    }

    #[test]
    fn test_clock_going_backwards() {
        let keys = KeyGenerator::new();
        assert_eq!(keys.next_key_at(5_000), 5_000);
        assert_eq!(keys.next_key_at(4_000), 5_001);
        assert_eq!(keys.next_key_at(6_000), 6_000);
    }

    #[test]
    fn test_concurrent_keys_are_unique() {
        let keys = Arc::new(KeyGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let keys = Arc::clone(&keys);
                thread::spawn(move || (0..1_000).map(|_| keys.next_key()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            let issued = handle.join().unwrap();
            // Each thread observes its own keys in increasing order
            assert!(issued.windows(2).all(|w| w[0] < w[1]));
            all.extend(issued);
        }
        assert_eq!(all.len(), 8_000);
    }
}
