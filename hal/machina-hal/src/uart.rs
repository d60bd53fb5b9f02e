//! UART serial communication abstractions
//!
//! Provides the interrupt-driven interface a chip-specific HAL exposes
//! for a UART peripheral: line configuration, per-direction interrupt
//! enables, FIFO access and a single interrupt callback slot.

use core::fmt;

use crate::device::{Device, DeviceError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interrupt callback installed on a UART device
///
/// The device layer calls [`IrqHandler::on_interrupt`] from interrupt
/// context whenever the peripheral signals an RX-ready or TX-ready
/// condition while the matching interrupt source is enabled.
/// Implementations must not block or allocate.
pub trait IrqHandler<D: ?Sized>: Sync {
    /// Service whatever conditions are pending on `dev`
    fn on_interrupt(&self, dev: &D);
}

/// Interrupt-driven UART peripheral
///
/// All methods take `&self`: a device handle is shared between the
/// foreground code and the interrupt callback, and the implementation
/// is expected to map each call onto a register access.
pub trait UartDevice: Device + Sync {
    /// Apply a line configuration
    ///
    /// Returns [`DeviceError::Rejected`] when the hardware cannot honour
    /// the requested settings.
    fn configure(&self, config: &UartConfig) -> Result<(), DeviceError>;

    /// Read back the active line configuration
    fn config(&self) -> UartConfig;

    /// Install (or with `None`, remove) the interrupt callback
    fn set_callback(&self, handler: Option<&'static dyn IrqHandler<Self>>);

    /// Enable the RX-ready interrupt source
    fn irq_rx_enable(&self);

    /// Disable the RX-ready interrupt source
    fn irq_rx_disable(&self);

    /// Enable the TX-ready interrupt source
    fn irq_tx_enable(&self);

    /// Disable the TX-ready interrupt source
    fn irq_tx_disable(&self);

    /// Latch interrupt status; `false` means nothing is pending
    fn irq_pending(&self) -> bool;

    /// Check if the RX FIFO holds data and RX interrupts are enabled
    fn irq_rx_ready(&self) -> bool;

    /// Check if the TX FIFO can accept data and TX interrupts are enabled
    fn irq_tx_ready(&self) -> bool;

    /// Check if every byte has been physically shifted out
    fn irq_tx_complete(&self) -> bool;

    /// Read up to `buf.len()` bytes from the RX FIFO
    ///
    /// Returns the number of bytes read (0 when the FIFO is empty).
    fn fifo_read(&self, buf: &mut [u8]) -> usize;

    /// Push up to `data.len()` bytes into the TX FIFO
    ///
    /// Returns the number of bytes the FIFO accepted.
    fn fifo_fill(&self, data: &[u8]) -> usize;
}

/// UART line configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits per frame
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Hardware flow control
    pub flow_control: FlowControl,
}

impl UartConfig {
    /// 115200 baud, 8 data bits, no parity, 1 stop bit, no flow control
    pub const DEFAULT: Self = Self {
        baudrate: 115200,
        data_bits: DataBits::Eight,
        parity: Parity::None,
        stop_bits: StopBits::One,
        flow_control: FlowControl::None,
    };
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
    Nine,
}

impl DataBits {
    /// Create from a bit count
    pub fn from_count(bits: u8) -> Option<Self> {
        match bits {
            5 => Some(DataBits::Five),
            6 => Some(DataBits::Six),
            7 => Some(DataBits::Seven),
            8 => Some(DataBits::Eight),
            9 => Some(DataBits::Nine),
            _ => None,
        }
    }

    /// Number of bits per frame
    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        }
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Label used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            Parity::None => "None",
            Parity::Odd => "Odd",
            Parity::Even => "Even",
            Parity::Mark => "Mark",
            Parity::Space => "Space",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopBits {
    Half,
    One,
    OneAndHalf,
    Two,
}

impl StopBits {
    /// Label used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            StopBits::Half => "0.5",
            StopBits::One => "1",
            StopBits::OneAndHalf => "1.5",
            StopBits::Two => "2",
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hardware flow control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FlowControl {
    None,
    RtsCts,
    DtrDsr,
}

impl FlowControl {
    /// Label used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            FlowControl::None => "None",
            FlowControl::RtsCts => "RTS/CTS",
            FlowControl::DtrDsr => "DTR/DSR",
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
