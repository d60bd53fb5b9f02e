//! Simulated DAC

use std::sync::Mutex;

use machina_hal::dac::{DacChannelConfig, DacDevice};
use machina_hal::{Device, DeviceError};

use crate::lock;

struct Inner {
    setups: Vec<DacChannelConfig>,
    writes: Vec<(u8, u32)>,
    fail_setup: bool,
    fail_write: bool,
}

/// Simulated DAC recording every value written
pub struct SimDac {
    name: &'static str,
    inner: Mutex<Inner>,
}

impl SimDac {
    /// Create a DAC with no recorded activity
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                setups: Vec::new(),
                writes: Vec::new(),
                fail_setup: false,
                fail_write: false,
            }),
        }
    }

    /// Make channel setup fail
    pub fn set_fail_setup(&self, fail: bool) {
        lock(&self.inner).fail_setup = fail;
    }

    /// Make writes fail
    pub fn set_fail_write(&self, fail: bool) {
        lock(&self.inner).fail_write = fail;
    }

    /// Most recent successful channel setup
    pub fn last_setup(&self) -> Option<DacChannelConfig> {
        lock(&self.inner).setups.last().copied()
    }

    /// All `(channel, value)` pairs written so far
    pub fn writes(&self) -> Vec<(u8, u32)> {
        lock(&self.inner).writes.clone()
    }
}

impl Device for SimDac {
    fn name(&self) -> &str {
        self.name
    }
}

impl DacDevice for SimDac {
    fn channel_setup(&self, config: &DacChannelConfig) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        if inner.fail_setup {
            return Err(DeviceError::Rejected);
        }
        inner.setups.push(*config);
        Ok(())
    }

    fn write_value(&self, channel: u8, value: u32) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        if inner.fail_write {
            return Err(DeviceError::Io);
        }
        inner.writes.push((channel, value));
        Ok(())
    }
}
