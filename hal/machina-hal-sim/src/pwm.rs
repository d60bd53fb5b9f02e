//! Simulated PWM

use std::sync::Mutex;

use machina_hal::pwm::{Polarity, PwmDevice};
use machina_hal::{Device, DeviceError};

use crate::lock;

/// One programmed output state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmOutput {
    pub channel: u8,
    pub period_ns: u32,
    pub pulse_ns: u32,
    pub polarity: Polarity,
}

struct Inner {
    history: Vec<PwmOutput>,
    fail: bool,
}

/// Simulated PWM controller recording every `set` call
pub struct SimPwm {
    name: &'static str,
    inner: Mutex<Inner>,
}

impl SimPwm {
    /// Create a controller with no recorded activity
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                history: Vec::new(),
                fail: false,
            }),
        }
    }

    /// Make `set` fail
    pub fn set_fail(&self, fail: bool) {
        lock(&self.inner).fail = fail;
    }

    /// Most recent programmed state
    pub fn last(&self) -> Option<PwmOutput> {
        lock(&self.inner).history.last().copied()
    }

    /// Number of successful `set` calls
    pub fn set_count(&self) -> usize {
        lock(&self.inner).history.len()
    }
}

impl Device for SimPwm {
    fn name(&self) -> &str {
        self.name
    }
}

impl PwmDevice for SimPwm {
    fn set(
        &self,
        channel: u8,
        period_ns: u32,
        pulse_ns: u32,
        polarity: Polarity,
    ) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        if inner.fail {
            return Err(DeviceError::Io);
        }
        inner.history.push(PwmOutput {
            channel,
            period_ns,
            pulse_ns,
            polarity,
        });
        Ok(())
    }
}
