//! Simulated interrupt-driven UART
//!
//! The model keeps two hardware FIFOs of [`FIFO_DEPTH`] bytes. Bytes put
//! on the line by a test land in the RX FIFO (excess is counted as
//! overrun); bytes the driver pushes into the TX FIFO stay there until
//! the test shifts them out onto the "wire".
//!
//! Interrupts are level-triggered: RX is pending while RX is enabled and
//! the RX FIFO is non-empty, TX is pending while TX is enabled and the TX
//! FIFO has room. [`SimUart::service`] plays the role of the interrupt
//! controller and calls the installed handler once.

use std::sync::Mutex;

use heapless::Deque;
use machina_hal::{Device, DeviceError, IrqHandler, UartConfig, UartDevice};

use crate::lock;

/// Depth of each hardware FIFO
pub const FIFO_DEPTH: usize = 16;

/// Upper bound on handler invocations in [`SimUart::pump`]
const PUMP_LIMIT: usize = 10_000;

struct Inner {
    config: UartConfig,
    configured: bool,
    reject_config: bool,
    rx_irq: bool,
    tx_irq: bool,
    rx_fifo: Deque<u8, FIFO_DEPTH>,
    tx_fifo: Deque<u8, FIFO_DEPTH>,
    wire: Vec<u8>,
    overruns: usize,
    irq_toggles: usize,
}

/// Simulated UART peripheral
pub struct SimUart {
    name: &'static str,
    inner: Mutex<Inner>,
    handler: Mutex<Option<&'static dyn IrqHandler<SimUart>>>,
}

impl SimUart {
    /// Create an unconfigured UART with all interrupts disabled
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                config: UartConfig::DEFAULT,
                configured: false,
                reject_config: false,
                rx_irq: false,
                tx_irq: false,
                rx_fifo: Deque::new(),
                tx_fifo: Deque::new(),
                wire: Vec::new(),
                overruns: 0,
                irq_toggles: 0,
            }),
            handler: Mutex::new(None),
        }
    }

    /// Make the next `configure` calls fail (or succeed again)
    pub fn set_reject_config(&self, reject: bool) {
        lock(&self.inner).reject_config = reject;
    }

    /// Check if a configuration has been accepted
    pub fn is_configured(&self) -> bool {
        lock(&self.inner).configured
    }

    /// Check the RX interrupt enable bit
    pub fn rx_irq_enabled(&self) -> bool {
        lock(&self.inner).rx_irq
    }

    /// Check the TX interrupt enable bit
    pub fn tx_irq_enabled(&self) -> bool {
        lock(&self.inner).tx_irq
    }

    /// Number of enable/disable calls made so far
    pub fn irq_toggles(&self) -> usize {
        lock(&self.inner).irq_toggles
    }

    /// Check if an interrupt callback is installed
    pub fn has_callback(&self) -> bool {
        lock(&self.handler).is_some()
    }

    /// Bytes that arrived while the RX FIFO was full
    pub fn overruns(&self) -> usize {
        lock(&self.inner).overruns
    }

    /// Bytes currently waiting in the RX FIFO
    pub fn rx_fifo_len(&self) -> usize {
        lock(&self.inner).rx_fifo.len()
    }

    /// Receive bytes from the line into the RX FIFO
    ///
    /// Returns how many fit; the rest are counted as overrun.
    pub fn receive(&self, bytes: &[u8]) -> usize {
        let mut inner = lock(&self.inner);
        let mut accepted = 0;
        for &byte in bytes {
            if inner.rx_fifo.push_back(byte).is_ok() {
                accepted += 1;
            } else {
                inner.overruns += 1;
            }
        }
        accepted
    }

    /// Shift up to `max` bytes from the TX FIFO onto the wire
    pub fn shift_out(&self, max: usize) -> usize {
        let mut inner = lock(&self.inner);
        let mut moved = 0;
        while moved < max {
            let Some(byte) = inner.tx_fifo.pop_front() else {
                break;
            };
            inner.wire.push(byte);
            moved += 1;
        }
        moved
    }

    /// Take everything shifted onto the wire so far
    pub fn take_transmitted(&self) -> Vec<u8> {
        core::mem::take(&mut lock(&self.inner).wire)
    }

    /// Raise the interrupt line once if anything is pending
    ///
    /// Returns `true` if the handler ran.
    pub fn service(&self) -> bool {
        let pending = {
            let inner = lock(&self.inner);
            Self::pending(&inner)
        };
        if !pending {
            return false;
        }
        let handler = *lock(&self.handler);
        match handler {
            Some(handler) => {
                handler.on_interrupt(self);
                true
            }
            None => false,
        }
    }

    /// Run interrupts and shift TX until the simulation goes quiet
    pub fn pump(&self) {
        for _ in 0..PUMP_LIMIT {
            let serviced = self.service();
            let moved = self.shift_out(FIFO_DEPTH);
            if !serviced && moved == 0 {
                break;
            }
        }
    }

    fn pending(inner: &Inner) -> bool {
        (inner.rx_irq && !inner.rx_fifo.is_empty()) || (inner.tx_irq && !inner.tx_fifo.is_full())
    }
}

impl Device for SimUart {
    fn name(&self) -> &str {
        self.name
    }
}

impl UartDevice for SimUart {
    fn configure(&self, config: &UartConfig) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        if inner.reject_config {
            return Err(DeviceError::Rejected);
        }
        inner.config = *config;
        inner.configured = true;
        Ok(())
    }

    fn config(&self) -> UartConfig {
        lock(&self.inner).config
    }

    fn set_callback(&self, handler: Option<&'static dyn IrqHandler<Self>>) {
        *lock(&self.handler) = handler;
    }

    fn irq_rx_enable(&self) {
        let mut inner = lock(&self.inner);
        inner.rx_irq = true;
        inner.irq_toggles += 1;
    }

    fn irq_rx_disable(&self) {
        let mut inner = lock(&self.inner);
        inner.rx_irq = false;
        inner.irq_toggles += 1;
    }

    fn irq_tx_enable(&self) {
        let mut inner = lock(&self.inner);
        inner.tx_irq = true;
        inner.irq_toggles += 1;
    }

    fn irq_tx_disable(&self) {
        let mut inner = lock(&self.inner);
        inner.tx_irq = false;
        inner.irq_toggles += 1;
    }

    fn irq_pending(&self) -> bool {
        Self::pending(&lock(&self.inner))
    }

    fn irq_rx_ready(&self) -> bool {
        let inner = lock(&self.inner);
        inner.rx_irq && !inner.rx_fifo.is_empty()
    }

    fn irq_tx_ready(&self) -> bool {
        let inner = lock(&self.inner);
        inner.tx_irq && !inner.tx_fifo.is_full()
    }

    fn irq_tx_complete(&self) -> bool {
        lock(&self.inner).tx_fifo.is_empty()
    }

    fn fifo_read(&self, buf: &mut [u8]) -> usize {
        let mut inner = lock(&self.inner);
        let mut count = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = inner.rx_fifo.pop_front() else {
                break;
            };
            *slot = byte;
            count += 1;
        }
        count
    }

    fn fifo_fill(&self, data: &[u8]) -> usize {
        let mut inner = lock(&self.inner);
        let mut count = 0;
        for &byte in data {
            if inner.tx_fifo.push_back(byte).is_err() {
                break;
            }
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_overrun() {
        let uart = SimUart::new("uart0");
        let data = [0xAAu8; FIFO_DEPTH + 3];
        assert_eq!(uart.receive(&data), FIFO_DEPTH);
        assert_eq!(uart.overruns(), 3);
        assert_eq!(uart.rx_fifo_len(), FIFO_DEPTH);
    }

    #[test]
    fn test_fill_and_shift() {
        let uart = SimUart::new("uart0");
        assert_eq!(uart.fifo_fill(b"hello"), 5);
        assert!(!uart.irq_tx_complete());
        assert_eq!(uart.shift_out(2), 2);
        assert_eq!(uart.shift_out(10), 3);
        assert!(uart.irq_tx_complete());
        assert_eq!(uart.take_transmitted(), b"hello");
    }

    #[test]
    fn test_ready_requires_enable() {
        let uart = SimUart::new("uart0");
        uart.receive(b"x");
        assert!(!uart.irq_rx_ready());
        uart.irq_rx_enable();
        assert!(uart.irq_rx_ready());
        assert!(uart.irq_pending());
        assert!(!uart.irq_tx_ready());
    }

    #[test]
    fn test_reject_config() {
        let uart = SimUart::new("uart0");
        uart.set_reject_config(true);
        assert_eq!(uart.configure(&UartConfig::DEFAULT), Err(DeviceError::Rejected));
        assert!(!uart.is_configured());
        uart.set_reject_config(false);
        assert_eq!(uart.configure(&UartConfig::DEFAULT), Ok(()));
        assert!(uart.is_configured());
    }
}
