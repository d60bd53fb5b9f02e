//! DAC binding

use core::fmt;

use machina_hal::dac::{DacChannelConfig, DacDevice};
use machina_hal::DeviceRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// DAC errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacError {
    /// No device under the requested name
    DeviceNotFound,
    /// The device rejected the channel setup
    Setup,
    /// Value does not fit the configured resolution
    OutOfRange,
    /// The device failed to drive the value
    Write,
}

impl fmt::Display for DacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DacError::DeviceNotFound => f.write_str("device not found"),
            DacError::Setup => f.write_str("DAC channel setup failed"),
            DacError::OutOfRange => f.write_str("value out of range"),
            DacError::Write => f.write_str("DAC write failed"),
        }
    }
}

/// DAC configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DacConfig {
    /// Hardware channel
    pub channel: u8,
    /// Output resolution in bits
    pub resolution: u8,
    /// Enable the output buffer
    pub buffered: bool,
}

impl Default for DacConfig {
    fn default() -> Self {
        Self {
            channel: 1,
            resolution: 8,
            buffered: true,
        }
    }
}

/// One DAC channel
pub struct Dac<D: DacDevice + 'static> {
    dev: &'static D,
    config: DacConfig,
}

impl<D: DacDevice + 'static> Dac<D> {
    /// Set up a channel on `dev`
    pub fn new(dev: &'static D, config: DacConfig) -> Result<Self, DacError> {
        let setup = DacChannelConfig {
            channel_id: config.channel,
            resolution: config.resolution,
            buffered: config.buffered,
        };
        dev.channel_setup(&setup).map_err(|_| {
            warn!("dac {=str}: channel {=u8} setup failed", dev.name(), config.channel);
            DacError::Setup
        })?;
        Ok(Self { dev, config })
    }

    /// Look `name` up in `registry`, then set up a channel on it
    pub fn open<R>(registry: &R, name: &str, config: DacConfig) -> Result<Self, DacError>
    where
        R: DeviceRegistry<D> + ?Sized,
    {
        let dev = registry
            .find(name)
            .map_err(|_| DacError::DeviceNotFound)?;
        Self::new(dev, config)
    }

    /// Largest value accepted by [`Dac::write`]
    pub fn max_value(&self) -> u32 {
        match self.config.resolution {
            bits @ 0..=31 => (1u32 << bits) - 1,
            _ => u32::MAX,
        }
    }

    /// Drive `value` on the channel
    pub fn write(&mut self, value: u32) -> Result<(), DacError> {
        if value > self.max_value() {
            return Err(DacError::OutOfRange);
        }
        self.dev
            .write_value(self.config.channel, value)
            .map_err(|_| DacError::Write)
    }

    /// Active configuration
    pub fn config(&self) -> &DacConfig {
        &self.config
    }
}

impl<D: DacDevice + 'static> fmt::Display for Dac<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DAC({}, channel={}, resolution={} buffered={})",
            self.dev.name(),
            self.config.channel,
            self.config.resolution,
            u8::from(self.config.buffered)
        )
    }
}
