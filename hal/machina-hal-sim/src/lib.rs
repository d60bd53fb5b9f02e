//! Simulated peripherals for host-side testing
//!
//! Each simulator implements the matching `machina-hal` trait with enough
//! hardware behaviour to drive the bindings through their real code
//! paths:
//!
//! - [`SimUart`] - bounded RX/TX FIFOs, interrupt enable bits, a callback
//!   slot and a "wire" collecting transmitted bytes
//! - [`SimAdc`], [`SimDac`], [`SimPwm`] - record requests and can be told
//!   to fail
//! - [`ManualClock`] - a clock that advances on every read
//!
//! All simulators are `const`-constructible so tests can keep them in
//! `static`s, matching how device handles are `&'static` on target.

pub mod adc;
pub mod clock;
pub mod dac;
pub mod pwm;
pub mod uart;

pub use adc::SimAdc;
pub use clock::ManualClock;
pub use dac::SimDac;
pub use pwm::SimPwm;
pub use uart::{SimUart, FIFO_DEPTH};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a simulator mutex, ignoring poisoning from a panicked test
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
