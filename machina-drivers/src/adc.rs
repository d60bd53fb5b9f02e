//! ADC binding
//!
//! Configures one channel with unity gain and the internal reference,
//! then takes calibrated single-sample readings.
//!
//! ```ignore
//! let mut adc = Adc::new(&ADC0, AdcConfig::default())?;
//! let raw = adc.read()?;
//! let uv = adc.read_uv()?;
//! ```

use core::fmt;

use machina_hal::adc::{AcquisitionTime, AdcChannelConfig, AdcDevice, AdcSequence, Gain, Reference};
use machina_hal::DeviceRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reference voltage used for microvolt conversion
pub const REFERENCE_MV: i32 = 3300;

/// Channel count addressable by a sequence mask
const MAX_CHANNELS: u8 = 32;

/// ADC errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// Channel or resolution out of range
    InvalidArgument,
    /// No device under the requested name
    DeviceNotFound,
    /// The device rejected the channel setup
    Setup,
    /// The conversion failed
    Read,
}

impl fmt::Display for AdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdcError::InvalidArgument => f.write_str("invalid argument"),
            AdcError::DeviceNotFound => f.write_str("device not found"),
            AdcError::Setup => f.write_str("ADC channel setup failed"),
            AdcError::Read => f.write_str("ADC read failed"),
        }
    }
}

/// ADC configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdcConfig {
    /// Hardware channel (0-31)
    pub channel: u8,
    /// Conversion resolution in bits (1-16)
    pub resolution: u8,
    /// Attenuation; `None` keeps the current value
    pub attenuation: Option<u8>,
    /// Sample time in ns; `None` keeps the current value
    pub sample_ns: Option<u8>,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            channel: 1,
            resolution: 8,
            attenuation: None,
            sample_ns: None,
        }
    }
}

/// One ADC channel
pub struct Adc<D: AdcDevice + 'static> {
    dev: &'static D,
    channel: u8,
    resolution: u8,
    attenuation: u8,
    sample_ns: u8,
}

impl<D: AdcDevice + 'static> Adc<D> {
    /// Set up a channel on `dev`
    pub fn new(dev: &'static D, config: AdcConfig) -> Result<Self, AdcError> {
        let mut adc = Self {
            dev,
            channel: 0,
            resolution: 12,
            attenuation: 0,
            sample_ns: 0,
        };
        adc.init(config)?;
        Ok(adc)
    }

    /// Look `name` up in `registry`, then set up a channel on it
    pub fn open<R>(registry: &R, name: &str, config: AdcConfig) -> Result<Self, AdcError>
    where
        R: DeviceRegistry<D> + ?Sized,
    {
        let dev = registry
            .find(name)
            .map_err(|_| AdcError::DeviceNotFound)?;
        Self::new(dev, config)
    }

    /// Apply `config` and set the channel up again
    pub fn init(&mut self, config: AdcConfig) -> Result<(), AdcError> {
        if config.channel >= MAX_CHANNELS || !(1..=16).contains(&config.resolution) {
            return Err(AdcError::InvalidArgument);
        }

        if let Some(attenuation) = config.attenuation {
            self.attenuation = attenuation;
        }
        if let Some(ns) = config.sample_ns {
            self.sample_ns = ns;
        }
        self.resolution = config.resolution;
        self.channel = config.channel;

        let setup = AdcChannelConfig {
            channel_id: self.channel,
            gain: Gain::One,
            reference: Reference::Internal,
            acquisition_time: AcquisitionTime::Default,
        };
        self.dev.channel_setup(&setup).map_err(|_| {
            warn!("adc {=str}: channel {=u8} setup failed", self.dev.name(), self.channel);
            AdcError::Setup
        })
    }

    /// Take one raw sample
    pub fn read(&mut self) -> Result<i16, AdcError> {
        let sequence = AdcSequence {
            channels: 1 << self.channel,
            resolution: self.resolution,
            calibrate: true,
        };
        let mut sample = [0i16; 1];
        self.dev
            .read(&sequence, &mut sample)
            .map_err(|_| AdcError::Read)?;
        Ok(sample[0])
    }

    /// Take one sample scaled to the full 16-bit range
    pub fn read_u16(&mut self) -> Result<u16, AdcError> {
        let raw = self.read()?;
        Ok(scale_to_u16(raw, self.resolution))
    }

    /// Take one sample converted to microvolts
    pub fn read_uv(&mut self) -> Result<i32, AdcError> {
        let raw = self.read()?;
        Ok(raw_to_millivolts(raw, self.resolution) * 1000)
    }

    /// Hardware channel
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Conversion resolution in bits
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// Stored attenuation setting
    pub fn attenuation(&self) -> u8 {
        self.attenuation
    }

    /// Stored sample time setting
    pub fn sample_ns(&self) -> u8 {
        self.sample_ns
    }
}

impl<D: AdcDevice + 'static> fmt::Display for Adc<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ADC({}, channel={}, resolution={})",
            self.dev.name(),
            self.channel,
            self.resolution
        )
    }
}

/// Scale a `resolution`-bit sample to 16 bits
///
/// The sample is shifted to the top and its high bits are repeated into
/// the low bits, so full scale maps to `0xFFFF`. Negative samples clamp
/// to 0.
pub fn scale_to_u16(raw: i16, resolution: u8) -> u16 {
    let bits = u32::from(resolution.clamp(1, 16));
    let value = u32::from(raw.max(0) as u16) & ((1 << bits) - 1);

    let mut out = 0u32;
    let mut pos = 16;
    while pos > 0 {
        if pos >= bits {
            out |= value << (pos - bits);
            pos -= bits;
        } else {
            out |= value >> (bits - pos);
            pos = 0;
        }
    }
    out as u16
}

/// Convert a raw sample to millivolts at unity gain
pub fn raw_to_millivolts(raw: i16, resolution: u8) -> i32 {
    (i32::from(raw) * REFERENCE_MV) >> resolution
}
