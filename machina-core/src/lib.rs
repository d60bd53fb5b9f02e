//! Board-agnostic core of the Machina peripheral bindings
//!
//! This crate contains the interrupt-driven UART transport and the
//! primitives it is built from:
//!
//! - [`ring`] - lock-free single-producer/single-consumer byte ring
//! - [`uart`] - per-port state, interrupt handler, configuration and
//!   the read/write/poll API
//! - [`stream`] - poll flags and ioctl requests shared with the
//!   scripting bindings
//! - [`registry`] - fixed-size device table for lookup by name
//!
//! Everything here talks to hardware through `machina-hal` traits only.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod registry;
pub mod ring;
pub mod stream;
pub mod uart;

pub use registry::DeviceTable;
pub use ring::RingBuffer;
pub use stream::{Ioctl, PollFlags};
pub use uart::{State, Uart, UartError, UartSettings};
