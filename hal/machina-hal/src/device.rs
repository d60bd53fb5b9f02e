//! Device identity and lookup
//!
//! Peripherals are resolved by name through an injected registry rather
//! than a global table, so bindings can be exercised against fakes.

/// Errors reported by the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// No device is registered under the requested name
    NotFound,
    /// The device refused the request (unsupported settings, table full)
    Rejected,
    /// The device failed while carrying out the request
    Io,
}

/// A named peripheral
pub trait Device {
    /// Name the device is registered under
    fn name(&self) -> &str;
}

/// Lookup service resolving device names to handles
///
/// Returned handles are borrowed for the program lifetime; the registry
/// owns nothing and callers never free them.
pub trait DeviceRegistry<D: ?Sized + 'static> {
    /// Find a device by its exact name
    fn find(&self, name: &str) -> Result<&'static D, DeviceError>;
}
