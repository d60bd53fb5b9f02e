//! Peripheral bindings for analog and PWM devices
//!
//! Each binding owns a `&'static` device handle from `machina-hal` plus
//! its own configuration, and exposes the operations the scripting layer
//! calls:
//!
//! - [`adc::Adc`] - single-shot analog reads, raw, 16-bit scaled or in
//!   microvolts
//! - [`dac::Dac`] - range-checked analog output
//! - [`pwm::Pwm`] - period/pulse control by frequency, 16-bit duty or
//!   nanoseconds
//!
//! All arithmetic is integer-only.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod adc;
pub mod dac;
pub mod pwm;

pub use adc::{Adc, AdcConfig, AdcError};
pub use dac::{Dac, DacConfig, DacError};
pub use pwm::{Pwm, PwmConfig, PwmError};
