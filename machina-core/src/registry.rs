//! Device table for lookup by name
//!
//! A fixed-capacity table the board layer fills at startup and hands to
//! the bindings as their [`DeviceRegistry`].

use heapless::Vec;
use machina_hal::{Device, DeviceError, DeviceRegistry};

/// Fixed-capacity table of `N` devices of type `D`
pub struct DeviceTable<D: Device + ?Sized + 'static, const N: usize> {
    devices: Vec<&'static D, N>,
}

impl<D: Device + ?Sized + 'static, const N: usize> Default for DeviceTable<D, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device + ?Sized + 'static, const N: usize> DeviceTable<D, N> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Add a device
    ///
    /// Fails with [`DeviceError::Rejected`] when the table is full or the
    /// name is already taken.
    pub fn register(&mut self, device: &'static D) -> Result<(), DeviceError> {
        if self.devices.iter().any(|d| d.name() == device.name()) {
            return Err(DeviceError::Rejected);
        }
        self.devices
            .push(device)
            .map_err(|_| DeviceError::Rejected)
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl<D: Device + ?Sized + 'static, const N: usize> DeviceRegistry<D> for DeviceTable<D, N> {
    fn find(&self, name: &str) -> Result<&'static D, DeviceError> {
        self.devices
            .iter()
            .copied()
            .find(|d| d.name() == name)
            .ok_or(DeviceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_hal_sim::SimUart;

    static UART0: SimUart = SimUart::new("uart0");
    static UART1: SimUart = SimUart::new("uart1");
    static UART0_DUP: SimUart = SimUart::new("uart0");

    #[test]
    fn test_find_by_name() {
        let mut table: DeviceTable<SimUart, 4> = DeviceTable::new();
        table.register(&UART0).unwrap();
        table.register(&UART1).unwrap();

        assert!(core::ptr::eq(table.find("uart1").unwrap(), &UART1));
        assert_eq!(table.find("uart7").err(), Some(DeviceError::NotFound));
    }

    #[test]
    fn test_register_rejects_duplicates_and_overflow() {
        let mut table: DeviceTable<SimUart, 1> = DeviceTable::new();
        table.register(&UART0).unwrap();
        assert_eq!(table.register(&UART0_DUP), Err(DeviceError::Rejected));
        assert_eq!(table.register(&UART1), Err(DeviceError::Rejected));
        assert_eq!(table.len(), 1);
    }
}
