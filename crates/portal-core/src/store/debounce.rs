//! Scheduled-flush primitives for the read-state store.
//!
//! Persistence is debounced: every mutation re-arms a single deadline and
//! the host loop polls `flush_due`. Time comes from an injectable clock so
//! tests can drive the deadline by hand instead of sleeping.

use std::sync::atomic::{AtomicI64, Ordering};

/// Wall-clock source, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Real wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Test clock advanced by hand.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A single cancel-and-reschedule deadline.
///
/// `schedule` replaces any armed deadline, which is what coalesces a burst
/// of mutations into one flush.
#[derive(Debug, Default)]
pub struct Debounce {
    deadline: Option<i64>,
}

impl Debounce {
    pub fn schedule(&mut self, at_millis: i64) {
        self.deadline = Some(at_millis);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now_millis: i64) -> bool {
        self.deadline.map_or(false, |deadline| now_millis >= deadline)
    }

    /// Disarm, reporting whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
