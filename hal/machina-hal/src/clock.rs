//! Time source abstraction

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point
    fn now_ms(&self) -> u64;
}
