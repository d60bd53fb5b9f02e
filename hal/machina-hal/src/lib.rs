//! Machina Hardware Abstraction Layer
//!
//! This crate defines the peripheral traits that a board support layer
//! implements on top of its chip drivers. The bindings in `machina-core`
//! (UART transport) and `machina-drivers` (ADC, DAC, PWM) only ever talk
//! to hardware through these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Scripting bindings (external)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ machina-core  │       │ machina-      │
//! │ (UART)        │       │ drivers       │
//! └───────────────┘       └───────────────┘
//!         │                       │
//!         └───────────┬───────────┘
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  machina-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!          board / chip driver layer
//! ```
//!
//! # Traits
//!
//! - [`uart::UartDevice`], [`uart::IrqHandler`] - Interrupt-driven serial
//! - [`adc::AdcDevice`] - Analog input
//! - [`dac::DacDevice`] - Analog output
//! - [`pwm::PwmDevice`] - Pulse width modulation
//! - [`device::Device`], [`device::DeviceRegistry`] - Lookup by name
//! - [`clock::Clock`] - Millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod clock;
pub mod dac;
pub mod device;
pub mod pwm;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use adc::AdcDevice;
pub use clock::Clock;
pub use dac::DacDevice;
pub use device::{Device, DeviceError, DeviceRegistry};
pub use pwm::PwmDevice;
pub use uart::{IrqHandler, UartConfig, UartDevice};
