//! Simulated ADC

use std::sync::Mutex;

use machina_hal::adc::{AdcChannelConfig, AdcDevice, AdcSequence};
use machina_hal::{Device, DeviceError};

use crate::lock;

const CHANNELS: usize = 32;

struct Inner {
    samples: [i16; CHANNELS],
    setups: Vec<AdcChannelConfig>,
    last_sequence: Option<AdcSequence>,
    fail_setup: bool,
    fail_read: bool,
}

/// Simulated ADC returning preset samples per channel
pub struct SimAdc {
    name: &'static str,
    inner: Mutex<Inner>,
}

impl SimAdc {
    /// Create an ADC whose channels all read 0
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                samples: [0; CHANNELS],
                setups: Vec::new(),
                last_sequence: None,
                fail_setup: false,
                fail_read: false,
            }),
        }
    }

    /// Set the value the next reads of `channel` return
    pub fn set_sample(&self, channel: u8, value: i16) {
        lock(&self.inner).samples[channel as usize % CHANNELS] = value;
    }

    /// Make channel setup fail
    pub fn set_fail_setup(&self, fail: bool) {
        lock(&self.inner).fail_setup = fail;
    }

    /// Make reads fail
    pub fn set_fail_read(&self, fail: bool) {
        lock(&self.inner).fail_read = fail;
    }

    /// Most recent successful channel setup
    pub fn last_setup(&self) -> Option<AdcChannelConfig> {
        lock(&self.inner).setups.last().copied()
    }

    /// Most recent read request
    pub fn last_sequence(&self) -> Option<AdcSequence> {
        lock(&self.inner).last_sequence
    }
}

impl Device for SimAdc {
    fn name(&self) -> &str {
        self.name
    }
}

impl AdcDevice for SimAdc {
    fn channel_setup(&self, config: &AdcChannelConfig) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        if inner.fail_setup || config.channel_id as usize >= CHANNELS {
            return Err(DeviceError::Rejected);
        }
        inner.setups.push(*config);
        Ok(())
    }

    fn read(&self, sequence: &AdcSequence, buf: &mut [i16]) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        inner.last_sequence = Some(*sequence);
        if inner.fail_read {
            return Err(DeviceError::Io);
        }
        let mut slots = buf.iter_mut();
        for channel in (0..CHANNELS).filter(|ch| sequence.channels & (1 << ch) != 0) {
            let slot = slots.next().ok_or(DeviceError::Io)?;
            *slot = inner.samples[channel];
        }
        Ok(())
    }
}
