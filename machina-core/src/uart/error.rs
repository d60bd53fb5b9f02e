//! UART error type

use core::fmt;

use machina_hal::DeviceError;

use crate::ring::AllocError;

/// Errors surfaced by the UART transport
///
/// All of these are reported synchronously by the call that failed.
/// Buffer overflow and short reads/writes are flow control, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Data bit count outside 0 and 5..=9
    InvalidDataBits(u8),
    /// Stop bit count outside 0..=2
    InvalidStopBits(u8),
    /// Baud rate of zero
    InvalidBaudrate,
    /// The device rejected the line configuration
    ConfigFailed,
    /// RX or TX buffer could not be allocated
    OutOfMemory,
    /// No device under the requested name
    DeviceNotFound,
    /// Another handle already owns this port state
    Busy,
    /// Unsupported ioctl request
    InvalidRequest,
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UartError::InvalidDataBits(_) => f.write_str("invalid data bits"),
            UartError::InvalidStopBits(_) => f.write_str("invalid stop bits"),
            UartError::InvalidBaudrate => f.write_str("invalid baudrate"),
            UartError::ConfigFailed => f.write_str("Could not configure device"),
            UartError::OutOfMemory => f.write_str("Could not alloc buffer"),
            UartError::DeviceNotFound => f.write_str("device not found"),
            UartError::Busy => f.write_str("UART already in use"),
            UartError::InvalidRequest => f.write_str("invalid request"),
        }
    }
}

impl From<DeviceError> for UartError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::NotFound => UartError::DeviceNotFound,
            DeviceError::Rejected | DeviceError::Io => UartError::ConfigFailed,
        }
    }
}

impl From<AllocError> for UartError {
    fn from(_: AllocError) -> Self {
        UartError::OutOfMemory
    }
}

impl embedded_io::Error for UartError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            UartError::InvalidDataBits(_)
            | UartError::InvalidStopBits(_)
            | UartError::InvalidBaudrate
            | UartError::InvalidRequest => embedded_io::ErrorKind::InvalidInput,
            UartError::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            UartError::DeviceNotFound => embedded_io::ErrorKind::NotFound,
            UartError::ConfigFailed | UartError::Busy => embedded_io::ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, ErrorKind};

    #[test]
    fn test_messages() {
        let cases = [
            (UartError::InvalidDataBits(4), "invalid data bits"),
            (UartError::InvalidStopBits(3), "invalid stop bits"),
            (UartError::InvalidBaudrate, "invalid baudrate"),
            (UartError::ConfigFailed, "Could not configure device"),
            (UartError::OutOfMemory, "Could not alloc buffer"),
            (UartError::DeviceNotFound, "device not found"),
            (UartError::Busy, "UART already in use"),
            (UartError::InvalidRequest, "invalid request"),
        ];
        for (error, message) in cases {
            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn test_error_kinds() {
        let cases = [
            (UartError::InvalidDataBits(4), ErrorKind::InvalidInput),
            (UartError::InvalidStopBits(3), ErrorKind::InvalidInput),
            (UartError::InvalidBaudrate, ErrorKind::InvalidInput),
            (UartError::InvalidRequest, ErrorKind::InvalidInput),
            (UartError::OutOfMemory, ErrorKind::OutOfMemory),
            (UartError::DeviceNotFound, ErrorKind::NotFound),
            (UartError::ConfigFailed, ErrorKind::Other),
            (UartError::Busy, ErrorKind::Other),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind);
        }
    }

    #[test]
    fn test_conversions() {
        assert_eq!(UartError::from(DeviceError::NotFound), UartError::DeviceNotFound);
        assert_eq!(UartError::from(DeviceError::Rejected), UartError::ConfigFailed);
        assert_eq!(UartError::from(DeviceError::Io), UartError::ConfigFailed);
        assert_eq!(UartError::from(AllocError), UartError::OutOfMemory);
    }
}
