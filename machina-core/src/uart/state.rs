//! Interrupt-shared half of a UART port

use machina_hal::{IrqHandler, UartDevice};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use super::irq;
use crate::ring::RingBuffer;

/// Per-port state shared with the interrupt handler
///
/// Holds the two rings. The RX ring is filled by the interrupt handler
/// and drained by [`Uart::read`](super::Uart::read); the TX ring is
/// filled by [`Uart::write`](super::Uart::write) and drained by the
/// interrupt handler. Keep one `State` per port in a `static`:
///
/// ```ignore
/// static UART0_STATE: State = State::new();
/// ```
pub struct State {
    pub(crate) rx: RingBuffer,
    pub(crate) tx: RingBuffer,
    pub(crate) dropped: AtomicUsize,
    claimed: AtomicBool,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Create state with no buffers allocated
    pub const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            dropped: AtomicUsize::new(0),
            claimed: AtomicBool::new(false),
        }
    }

    /// Check if a [`Uart`](super::Uart) currently owns this state
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Take ownership; `false` if already taken
    pub(crate) fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn unclaim(&self) {
        self.claimed.store(false, Ordering::Release);
    }
}

impl<D: UartDevice + ?Sized> IrqHandler<D> for State {
    fn on_interrupt(&self, dev: &D) {
        irq::on_interrupt(dev, self);
    }
}
