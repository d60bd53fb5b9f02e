//! ADC abstractions
//!
//! Channel setup and single-shot sequence reads, modelled on the usual
//! "configure a channel, then read a sequence" split of MCU ADC drivers.

use crate::device::{Device, DeviceError};

/// Amplifier gain applied before conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// 1/2
    Half,
    /// Unity gain
    #[default]
    One,
    /// x2
    Two,
}

/// Conversion reference voltage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Internal reference
    #[default]
    Internal,
    /// Supply voltage
    Vdd,
    /// External reference pin
    External,
}

/// Sample acquisition time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionTime {
    /// Driver default
    #[default]
    Default,
    /// Explicit time in nanoseconds
    Nanos(u16),
}

/// Per-channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcChannelConfig {
    /// Hardware channel number
    pub channel_id: u8,
    /// Gain
    pub gain: Gain,
    /// Reference
    pub reference: Reference,
    /// Acquisition time
    pub acquisition_time: AcquisitionTime,
}

/// A read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcSequence {
    /// Bit mask of channels to sample
    pub channels: u32,
    /// Conversion resolution in bits
    pub resolution: u8,
    /// Run calibration before sampling
    pub calibrate: bool,
}

/// ADC peripheral
pub trait AdcDevice: Device + Sync {
    /// Configure one channel
    fn channel_setup(&self, config: &AdcChannelConfig) -> Result<(), DeviceError>;

    /// Sample the channels in `sequence` into `buf`, one sample per channel
    fn read(&self, sequence: &AdcSequence, buf: &mut [i16]) -> Result<(), DeviceError>;
}
