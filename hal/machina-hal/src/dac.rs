//! DAC abstractions

use crate::device::{Device, DeviceError};

/// Per-channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacChannelConfig {
    /// Hardware channel number
    pub channel_id: u8,
    /// Output resolution in bits
    pub resolution: u8,
    /// Enable the output buffer amplifier
    pub buffered: bool,
}

/// DAC peripheral
pub trait DacDevice: Device + Sync {
    /// Configure one channel
    fn channel_setup(&self, config: &DacChannelConfig) -> Result<(), DeviceError>;

    /// Drive `value` on `channel`
    fn write_value(&self, channel: u8, value: u32) -> Result<(), DeviceError>;
}
