//! Counting gate that wakes a cache cleaner thread.
//!
//! Hot-path operations call [`CleanerGate::count_down`] whenever they leave
//! the cache above its trigger. Once `threshold` such calls have been made the
//! gate opens and the single waiting cleaner wakes. Consuming the signal
//! re-arms the gate inside the same critical section, so a count-down racing
//! with the wakeup is never lost: it either contributes to the signal being
//! consumed or to the next one.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Why [`CleanerGate::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// Enough count-downs happened; the cleaner should run.
    Open,
    /// The wait timed out without the gate opening.
    Timeout,
    /// The gate was closed; the cleaner should exit.
    Closed,
}

#[derive(Debug)]
struct GateState {
    threshold: usize,
    remaining: usize,
    open: bool,
    closed: bool,
    /// Number of times the gate has opened and been consumed.
    generation: u64,
}

/// Single-consumer counting gate.
#[derive(Debug)]
pub struct CleanerGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl CleanerGate {
    /// Create a gate that opens after `threshold` count-downs.
    ///
    /// A threshold of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            state: Mutex::new(GateState {
                threshold,
                remaining: threshold,
                open: false,
                closed: false,
                generation: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Record one operation that left the cache above its trigger.
    pub fn count_down(&self) {
        let mut state = self.state.lock();
        if state.open || state.closed {
            return;
        }
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            state.open = true;
            self.cond.notify_one();
        }
    }

    /// Open the gate immediately, regardless of the count.
    pub fn open(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.open = true;
            self.cond.notify_one();
        }
    }

    /// Close the gate; current and future waits return [`GateSignal::Closed`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cond.notify_all();
    }

    /// Block until the gate opens or is closed.
    pub fn wait(&self) -> GateSignal {
        let mut state = self.state.lock();
        while !state.open && !state.closed {
            self.cond.wait(&mut state);
        }
        Self::consume(&mut state)
    }

    /// Block until the gate opens, is closed, or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> GateSignal {
        let mut state = self.state.lock();
        if !state.open && !state.closed {
            // Spurious wakeups just end this wait early; the caller loops.
            let _ = self.cond.wait_for(&mut state, timeout);
        }
        if !state.open && !state.closed {
            return GateSignal::Timeout;
        }
        Self::consume(&mut state)
    }

    /// Number of times the gate has opened and been consumed.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Whether the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn consume(state: &mut GateState) -> GateSignal {
        if state.closed {
            return GateSignal::Closed;
        }
        state.open = false;
        state.remaining = state.threshold;
        state.generation += 1;
        GateSignal::Open
    }
}
