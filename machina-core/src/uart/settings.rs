//! Line settings and their translation into a hardware configuration
//!
//! [`UartSettings`] is what the scripting layer passes in (keyword
//! arguments with defaults). [`translate`] validates it and produces the
//! [`UartConfig`] handed to the device; it performs no I/O, so a failed
//! translation leaves hardware and memory untouched.

use machina_hal::uart::{DataBits, FlowControl, Parity, StopBits, UartConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::UartError;

/// Default baud rate
pub const DEFAULT_BAUDRATE: u32 = 115200;

/// Default RX and TX buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Parity argument as supplied by the caller
///
/// Integers select parity by their low bit: odd values mean odd parity,
/// even values mean even parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParityArg {
    /// Argument omitted: keep the default
    #[default]
    Unset,
    /// Explicitly no parity
    None,
    /// Integer selector
    Value(i32),
}

impl ParityArg {
    /// Odd parity
    pub const ODD: Self = ParityArg::Value(1);
    /// Even parity
    pub const EVEN: Self = ParityArg::Value(0);
}

/// UART initialisation arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UartSettings {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Data bits (5-9, 0 keeps the default)
    pub bits: u8,
    /// Parity selector
    pub parity: ParityArg,
    /// Stop bits (1-2, 0 keeps the default)
    pub stop: u8,
    /// TX ring size in bytes
    pub txbuf: usize,
    /// RX ring size in bytes
    pub rxbuf: usize,
    /// Wait for the first byte, in ms (0 = no wait)
    pub timeout: u32,
    /// Wait between bytes, in ms (0 = no wait)
    pub timeout_char: u32,
}

impl Default for UartSettings {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            bits: 8,
            parity: ParityArg::Unset,
            stop: 1,
            txbuf: DEFAULT_BUFFER_SIZE,
            rxbuf: DEFAULT_BUFFER_SIZE,
            timeout: 0,
            timeout_char: 0,
        }
    }
}

impl UartSettings {
    /// Set the baud rate
    pub fn baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Set the data bits
    pub fn bits(mut self, bits: u8) -> Self {
        self.bits = bits;
        self
    }

    /// Set the parity
    pub fn parity(mut self, parity: ParityArg) -> Self {
        self.parity = parity;
        self
    }

    /// Set the stop bits
    pub fn stop(mut self, stop: u8) -> Self {
        self.stop = stop;
        self
    }

    /// Set the TX ring size
    pub fn txbuf(mut self, size: usize) -> Self {
        self.txbuf = size;
        self
    }

    /// Set the RX ring size
    pub fn rxbuf(mut self, size: usize) -> Self {
        self.rxbuf = size;
        self
    }

    /// Set the first-byte timeout in ms
    pub fn timeout(mut self, ms: u32) -> Self {
        self.timeout = ms;
        self
    }

    /// Set the inter-byte timeout in ms
    pub fn timeout_char(mut self, ms: u32) -> Self {
        self.timeout_char = ms;
        self
    }
}

/// Validate `settings` and build the hardware configuration
pub fn translate(settings: &UartSettings) -> Result<UartConfig, UartError> {
    let mut config = UartConfig::DEFAULT;

    match settings.bits {
        0 => {}
        bits => {
            config.data_bits =
                DataBits::from_count(bits).ok_or(UartError::InvalidDataBits(bits))?;
        }
    }

    config.stop_bits = match settings.stop {
        0 => config.stop_bits,
        1 => StopBits::One,
        2 => StopBits::Two,
        stop => return Err(UartError::InvalidStopBits(stop)),
    };

    match settings.parity {
        ParityArg::Unset => {}
        ParityArg::None => config.parity = Parity::None,
        ParityArg::Value(v) if v & 1 != 0 => config.parity = Parity::Odd,
        ParityArg::Value(_) => config.parity = Parity::Even,
    }

    if settings.baudrate == 0 {
        return Err(UartError::InvalidBaudrate);
    }
    config.baudrate = settings.baudrate;
    config.flow_control = FlowControl::None;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_translate_to_8n1() {
        let config = translate(&UartSettings::default()).unwrap();
        assert_eq!(config, UartConfig::DEFAULT);
    }

    #[test]
    fn test_invalid_bits_and_stop() {
        let bad_bits = UartSettings::default().bits(4);
        assert_eq!(translate(&bad_bits), Err(UartError::InvalidDataBits(4)));

        let bad_stop = UartSettings::default().stop(3);
        assert_eq!(translate(&bad_stop), Err(UartError::InvalidStopBits(3)));

        let bad_baud = UartSettings::default().baudrate(0);
        assert_eq!(translate(&bad_baud), Err(UartError::InvalidBaudrate));
    }

    #[test]
    fn test_zero_keeps_defaults() {
        let config = translate(&UartSettings::default().bits(0).stop(0)).unwrap();
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
    }

    #[test]
    fn test_parity_low_bit_rule() {
        let parity = |arg| translate(&UartSettings::default().parity(arg)).unwrap().parity;

        assert_eq!(parity(ParityArg::Unset), Parity::None);
        assert_eq!(parity(ParityArg::None), Parity::None);
        assert_eq!(parity(ParityArg::Value(1)), Parity::Odd);
        assert_eq!(parity(ParityArg::Value(7)), Parity::Odd);
        assert_eq!(parity(ParityArg::Value(-3)), Parity::Odd);
        assert_eq!(parity(ParityArg::Value(0)), Parity::Even);
        assert_eq!(parity(ParityArg::Value(2)), Parity::Even);
        assert_eq!(parity(ParityArg::ODD), Parity::Odd);
        assert_eq!(parity(ParityArg::EVEN), Parity::Even);
    }

    #[test]
    fn test_full_settings() {
        let settings = UartSettings::default()
            .baudrate(9600)
            .bits(7)
            .parity(ParityArg::EVEN)
            .stop(2);
        let config = translate(&settings).unwrap();
        assert_eq!(config.baudrate, 9600);
        assert_eq!(config.data_bits, DataBits::Seven);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::Two);
        assert_eq!(config.flow_control, FlowControl::None);
    }
}
