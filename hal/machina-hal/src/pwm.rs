//! PWM abstractions
//!
//! Timing is expressed in nanoseconds, period and pulse, the way most MCU
//! PWM drivers take it.

use crate::device::{Device, DeviceError};

/// Output polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Pulse is the high part of the period
    #[default]
    Normal,
    /// Pulse is the low part of the period
    Inverted,
}

/// PWM peripheral
pub trait PwmDevice: Device + Sync {
    /// Program `channel` with a period and pulse width
    fn set(
        &self,
        channel: u8,
        period_ns: u32,
        pulse_ns: u32,
        polarity: Polarity,
    ) -> Result<(), DeviceError>;
}
