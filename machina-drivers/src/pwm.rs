//! PWM binding
//!
//! Keeps the period and pulse width in nanoseconds and reprograms the
//! device whenever either changes. Frequency and 16-bit duty are derived
//! views of those two numbers.
//!
//! ```ignore
//! let mut pwm = Pwm::new(&PWM0, PwmConfig { channel: 2, freq: Some(1000), ..Default::default() })?;
//! pwm.set_duty_u16(32768)?;
//! ```

use core::fmt;

use machina_hal::pwm::{Polarity, PwmDevice};
use machina_hal::DeviceRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Channel number reserved as "no channel"
pub const UNSUPPORTED_CHANNEL: u8 = 255;

/// Default period in ns
pub const DEFAULT_PERIOD_NS: u32 = 1000;

/// Default pulse width in ns
pub const DEFAULT_PULSE_NS: u32 = 500;

/// PWM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmError {
    /// No device under the requested name
    DeviceNotFound,
    /// PWM is not available on this channel
    UnsupportedChannel(u8),
    /// Frequency of 0 or above 1 GHz
    InvalidArgument,
    /// The device rejected the initial configuration
    Init,
    /// The device rejected a frequency change
    Freq,
    /// The device rejected a duty change
    Duty,
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PwmError::DeviceNotFound => f.write_str("device not found"),
            PwmError::UnsupportedChannel(ch) => write!(f, "PWM not supported on channel {}", ch),
            PwmError::InvalidArgument => f.write_str("invalid argument"),
            PwmError::Init => f.write_str("PWM init error"),
            PwmError::Freq => f.write_str("PWM freq error"),
            PwmError::Duty => f.write_str("PWM duty error"),
        }
    }
}

/// PWM configuration
///
/// `None` fields keep the current value. `duty_ns` wins over
/// `duty_u16` when both are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PwmConfig {
    /// Hardware channel
    pub channel: u8,
    /// Frequency in Hz
    pub freq: Option<u32>,
    /// Duty cycle as a fraction of 65536
    pub duty_u16: Option<u32>,
    /// Pulse width in ns
    pub duty_ns: Option<u32>,
}

/// One PWM output
pub struct Pwm<D: PwmDevice + 'static> {
    dev: &'static D,
    channel: u8,
    period: u32,
    pulse: u32,
    active: bool,
}

impl<D: PwmDevice + 'static> Pwm<D> {
    /// Configure and start an output on `dev`
    pub fn new(dev: &'static D, config: PwmConfig) -> Result<Self, PwmError> {
        let mut pwm = Self {
            dev,
            channel: config.channel,
            period: DEFAULT_PERIOD_NS,
            pulse: DEFAULT_PULSE_NS,
            active: false,
        };
        pwm.init(config)?;
        Ok(pwm)
    }

    /// Look `name` up in `registry`, then configure an output on it
    pub fn open<R>(registry: &R, name: &str, config: PwmConfig) -> Result<Self, PwmError>
    where
        R: DeviceRegistry<D> + ?Sized,
    {
        let dev = registry
            .find(name)
            .map_err(|_| PwmError::DeviceNotFound)?;
        Self::new(dev, config)
    }

    /// Apply `config` and program the device
    pub fn init(&mut self, config: PwmConfig) -> Result<(), PwmError> {
        if config.channel == UNSUPPORTED_CHANNEL {
            return Err(PwmError::UnsupportedChannel(config.channel));
        }
        if let Some(freq) = config.freq {
            check_freq(freq)?;
        }

        self.channel = config.channel;
        if let Some(freq) = config.freq {
            self.period = NANOS_PER_SEC / freq;
        }
        if let Some(duty) = config.duty_u16 {
            self.pulse = duty_to_pulse(duty, self.period);
        }
        if let Some(ns) = config.duty_ns {
            self.pulse = ns;
        }

        self.apply().map_err(|_| {
            warn!("pwm {=str}: channel {=u8} init failed", self.dev.name(), self.channel);
            PwmError::Init
        })?;
        self.active = true;
        debug!(
            "pwm {=str}: channel {=u8} period={=u32}ns pulse={=u32}ns",
            self.dev.name(),
            self.channel,
            self.period,
            self.pulse
        );
        Ok(())
    }

    /// Drive the output low and mark it inactive
    pub fn deinit(&mut self) {
        if !self.active {
            return;
        }
        if self
            .dev
            .set(self.channel, self.period, 0, Polarity::Normal)
            .is_err()
        {
            warn!("pwm {=str}: channel {=u8} deinit failed", self.dev.name(), self.channel);
        }
        self.active = false;
    }

    /// Output frequency in Hz
    pub fn freq(&self) -> u32 {
        NANOS_PER_SEC / self.period.max(1)
    }

    /// Change the frequency, keeping the duty ratio
    pub fn set_freq(&mut self, freq: u32) -> Result<(), PwmError> {
        check_freq(freq)?;
        let period = NANOS_PER_SEC / freq;
        let pulse = rescale(self.pulse, self.period, period);
        self.dev
            .set(self.channel, period, pulse, Polarity::Normal)
            .map_err(|_| PwmError::Freq)?;
        self.period = period;
        self.pulse = pulse;
        Ok(())
    }

    /// Duty cycle as a fraction of 65536
    pub fn duty_u16(&mut self) -> Result<u16, PwmError> {
        self.activate()?;
        let duty = rescale(self.pulse, self.period, 65536);
        Ok(duty.min(u32::from(u16::MAX)) as u16)
    }

    /// Set the duty cycle as a fraction of 65536
    pub fn set_duty_u16(&mut self, duty: u32) -> Result<(), PwmError> {
        self.activate()?;
        self.pulse = duty_to_pulse(duty, self.period);
        self.apply().map_err(|_| PwmError::Duty)
    }

    /// Pulse width in ns
    pub fn duty_ns(&mut self) -> Result<u32, PwmError> {
        self.activate()?;
        Ok(self.pulse)
    }

    /// Set the pulse width in ns
    pub fn set_duty_ns(&mut self, ns: u32) -> Result<(), PwmError> {
        self.activate()?;
        self.pulse = ns;
        self.apply().map_err(|_| PwmError::Duty)
    }

    /// Hardware channel
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Period in ns
    pub fn period_ns(&self) -> u32 {
        self.period
    }

    /// Check if the output is running
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) -> Result<(), PwmError> {
        if !self.active {
            self.apply().map_err(|_| PwmError::Init)?;
            self.active = true;
        }
        Ok(())
    }

    fn apply(&self) -> Result<(), machina_hal::DeviceError> {
        self.dev
            .set(self.channel, self.period, self.pulse, Polarity::Normal)
    }
}

impl<D: PwmDevice + 'static> fmt::Display for Pwm<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PWM({})", self.channel)
    }
}

/// Accept frequencies whose period is at least 1 ns
fn check_freq(freq: u32) -> Result<(), PwmError> {
    if freq == 0 || freq > NANOS_PER_SEC {
        return Err(PwmError::InvalidArgument);
    }
    Ok(())
}

fn duty_to_pulse(duty: u32, period: u32) -> u32 {
    rescale(duty, 65536, period)
}

/// `value * to / from` without overflow
fn rescale(value: u32, from: u32, to: u32) -> u32 {
    if from == 0 {
        return 0;
    }
    let scaled = u64::from(value) * u64::from(to) / u64::from(from);
    scaled.min(u64::from(u32::MAX)) as u32
}
