//! Interrupt handler and interrupt-masking guard
//!
//! The handler is the only RX producer and the only TX consumer. The
//! foreground API excludes it by masking the one interrupt source that
//! touches the ring it is about to use, via [`IrqGuard`].

use machina_hal::UartDevice;
use portable_atomic::Ordering;

use super::State;

/// A UART interrupt source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqSource {
    Rx,
    Tx,
}

impl IrqSource {
    fn enable<D: UartDevice + ?Sized>(self, dev: &D) {
        match self {
            IrqSource::Rx => dev.irq_rx_enable(),
            IrqSource::Tx => dev.irq_tx_enable(),
        }
    }

    fn disable<D: UartDevice + ?Sized>(self, dev: &D) {
        match self {
            IrqSource::Rx => dev.irq_rx_disable(),
            IrqSource::Tx => dev.irq_tx_disable(),
        }
    }
}

/// Masks one interrupt source for its lifetime
///
/// The source is disabled on creation and enabled again when the guard
/// drops, on every exit path.
pub struct IrqGuard<'a, D: UartDevice + ?Sized> {
    dev: &'a D,
    source: IrqSource,
    rearm: bool,
}

impl<'a, D: UartDevice + ?Sized> IrqGuard<'a, D> {
    /// Disable `source` until the guard drops
    pub fn new(dev: &'a D, source: IrqSource) -> Self {
        source.disable(dev);
        Self {
            dev,
            source,
            rearm: true,
        }
    }

    /// Disable `source` and leave it disabled
    pub fn without_rearm(dev: &'a D, source: IrqSource) -> Self {
        source.disable(dev);
        Self {
            dev,
            source,
            rearm: false,
        }
    }
}

impl<D: UartDevice + ?Sized> Drop for IrqGuard<'_, D> {
    fn drop(&mut self) {
        if self.rearm {
            self.source.enable(self.dev);
        }
    }
}

/// Service every pending condition on `dev`
pub(crate) fn on_interrupt<D: UartDevice + ?Sized>(dev: &D, state: &State) {
    if !dev.irq_pending() {
        return;
    }

    if dev.irq_rx_ready() {
        service_rx(dev, state);
    }

    if dev.irq_tx_ready() {
        service_tx(dev, state);
    }
}

#[allow(unsafe_code)]
fn service_rx<D: UartDevice + ?Sized>(dev: &D, state: &State) {
    // SAFETY: the interrupt handler is the only RX producer
    let mut producer = unsafe { state.rx.producer() };
    let region = producer.claim_write(state.rx.capacity());

    if region.is_empty() {
        // Ring full: stop RX interrupts and empty the FIFO so the
        // peripheral does not flag an overrun. `read` re-enables RX.
        dev.irq_rx_disable();
        let mut byte = [0u8; 1];
        let mut discarded = 0;
        while dev.fifo_read(&mut byte) == 1 {
            discarded += 1;
        }
        state.dropped.fetch_add(discarded, Ordering::Relaxed);
        trace!("uart rx overflow, dropped {=usize} bytes", discarded);
        return;
    }

    let n = dev.fifo_read(region);
    producer.commit_write(n);
}

#[allow(unsafe_code)]
fn service_tx<D: UartDevice + ?Sized>(dev: &D, state: &State) {
    // SAFETY: the interrupt handler is the only TX consumer
    let mut consumer = unsafe { state.tx.consumer() };
    let pending = consumer.claim_read(state.tx.capacity());

    if pending.is_empty() {
        dev.irq_tx_disable();
        return;
    }

    let n = dev.fifo_fill(pending);
    if n > 0 {
        consumer.commit_read(n);
    }
}
