//! Manually driven clock

use std::sync::atomic::{AtomicU64, Ordering};

use machina_hal::Clock;

/// Clock that advances by a fixed step every time it is read
///
/// A step of 0 freezes time; use [`ManualClock::advance`] to move it.
pub struct ManualClock {
    now: AtomicU64,
    step: AtomicU64,
}

impl ManualClock {
    /// Create a clock at `start` ms advancing `step` ms per read
    pub const fn new(start: u64, step: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
            step: AtomicU64::new(step),
        }
    }

    /// Move time forward
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Change the per-read step
    pub fn set_step(&self, step: u64) {
        self.step.store(step, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let step = self.step.load(Ordering::SeqCst);
        self.now.fetch_add(step, Ordering::SeqCst)
    }
}
