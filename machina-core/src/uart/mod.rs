//! Interrupt-driven UART transport
//!
//! A port is made of two halves:
//!
//! - [`State`] - the rings shared with the interrupt handler, kept in a
//!   `static` so the handler can reach it
//! - [`Uart`] - the foreground handle used by the bindings
//!
//! ```ignore
//! static UART0_STATE: State = State::new();
//!
//! let mut uart = Uart::open(&devices, "uart0", &UART0_STATE, UartSettings::default())?;
//! let sent = uart.write(b"hello");
//! let mut buf = [0u8; 32];
//! let got = uart.read(&mut buf);
//! ```
//!
//! No call blocks. `write` accepts what fits in the TX ring and `read`
//! returns what is already in the RX ring; callers loop for the rest.

mod deadline;
mod error;
mod irq;
mod settings;
mod state;

use core::fmt;

use machina_hal::{DeviceRegistry, UartDevice};
use portable_atomic::Ordering;

pub use deadline::{read_deadline, read_deadline_with};
pub use error::UartError;
pub use irq::{IrqGuard, IrqSource};
pub use settings::{
    translate, ParityArg, UartSettings, DEFAULT_BAUDRATE, DEFAULT_BUFFER_SIZE,
};
pub use state::State;

use crate::ring::alloc_storage;
use crate::stream::{Ioctl, PollFlags};

/// Foreground handle to a UART port
///
/// Only one `Uart` can own a given [`State`] at a time. Dropping the
/// handle disables interrupts, detaches the handler and frees both
/// rings, in that order.
pub struct Uart<D: UartDevice + 'static> {
    dev: &'static D,
    state: &'static State,
    settings: UartSettings,
    /// Interrupts armed (cleared by `deinit`)
    active: bool,
    /// Handler installed and rings allocated
    attached: bool,
}

impl<D: UartDevice + 'static> Uart<D> {
    /// Claim `state` and initialise the port on `dev`
    pub fn new(
        dev: &'static D,
        state: &'static State,
        settings: UartSettings,
    ) -> Result<Self, UartError> {
        if !state.claim() {
            return Err(UartError::Busy);
        }
        let mut uart = Self {
            dev,
            state,
            settings,
            active: false,
            attached: false,
        };
        uart.init(settings)?;
        Ok(uart)
    }

    /// Resolve `name` through `registry`, then behave like [`Uart::new`]
    pub fn open<R>(
        registry: &R,
        name: &str,
        state: &'static State,
        settings: UartSettings,
    ) -> Result<Self, UartError>
    where
        R: DeviceRegistry<D> + ?Sized,
    {
        let dev = registry.find(name)?;
        Self::new(dev, state, settings)
    }

    /// (Re)initialise the port
    ///
    /// Settings are validated before anything is touched. On a live port
    /// the old configuration is then torn down (interrupts off, handler
    /// detached, rings freed) before the device is reconfigured, new
    /// rings are allocated and RX interrupts are armed. If a step after
    /// validation fails the port is left deinitialised with no rings.
    pub fn init(&mut self, settings: UartSettings) -> Result<(), UartError> {
        let config = translate(&settings).inspect_err(|_e| {
            warn!("uart {=str}: invalid settings: {}", self.dev.name(), _e);
        })?;

        self.teardown();

        self.dev.configure(&config).map_err(|_| {
            warn!("uart {=str}: configuration rejected", self.dev.name());
            UartError::ConfigFailed
        })?;

        let rx = alloc_storage(settings.rxbuf)?;
        let tx = alloc_storage(settings.txbuf)?;

        self.install(rx, tx);
        self.settings = settings;
        self.state.dropped.store(0, Ordering::Relaxed);

        self.dev.set_callback(Some(self.state));
        self.attached = true;
        self.dev.irq_rx_enable();
        self.active = true;

        debug!(
            "uart {=str}: init baud={=u32} rxbuf={=usize} txbuf={=usize}",
            self.dev.name(),
            config.baudrate,
            settings.rxbuf,
            settings.txbuf
        );
        Ok(())
    }

    #[allow(unsafe_code)]
    fn install(&mut self, rx: alloc::boxed::Box<[u8]>, tx: alloc::boxed::Box<[u8]>) {
        // SAFETY: `teardown` ran first, so both interrupt sources are off
        // and no handler is installed; `&mut self` excludes the
        // foreground halves
        unsafe {
            self.state.rx.install(rx);
            self.state.tx.install(tx);
        }
    }

    /// Disable RX and TX interrupts
    ///
    /// Safe to call repeatedly. Buffered RX data can still be read
    /// afterwards; writes are refused until the next [`Uart::init`].
    pub fn deinit(&mut self) {
        self.dev.irq_rx_disable();
        self.dev.irq_tx_disable();
        if self.active {
            debug!("uart {=str}: deinit", self.dev.name());
        }
        self.active = false;
    }

    #[allow(unsafe_code)]
    fn teardown(&mut self) {
        if !self.attached {
            return;
        }
        self.deinit();
        self.dev.set_callback(None);
        // SAFETY: interrupts are off and the handler is detached, so
        // nothing else can reach the rings
        unsafe {
            self.state.rx.release();
            self.state.tx.release();
        }
        self.attached = false;
    }

    /// Queue `data` for transmission
    ///
    /// Returns how many bytes were accepted, which is less than
    /// `data.len()` when the TX ring fills up. Callers retry with the
    /// remainder.
    #[allow(unsafe_code)]
    pub fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() || !self.active {
            return 0;
        }
        let _mask = IrqGuard::new(self.dev, IrqSource::Tx);
        // SAFETY: this handle is the only TX producer (unique claim on
        // the state, `&mut self`)
        let mut producer = unsafe { self.state.tx.producer() };
        producer.put(data)
    }

    /// Copy received bytes into `buf`
    ///
    /// Returns 0 straight away, without touching interrupts, when
    /// nothing has been received or `buf` is empty.
    #[allow(unsafe_code)]
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() || self.state.rx.is_empty() {
            return 0;
        }
        let _mask = if self.active {
            IrqGuard::new(self.dev, IrqSource::Rx)
        } else {
            IrqGuard::without_rearm(self.dev, IrqSource::Rx)
        };
        // SAFETY: this handle is the only RX consumer
        let mut consumer = unsafe { self.state.rx.consumer() };
        consumer.get(buf)
    }

    /// Bytes waiting in the RX ring
    pub fn any(&self) -> usize {
        self.state.rx.len()
    }

    /// Check if the hardware has shifted out every byte
    ///
    /// Reflects the peripheral only; bytes still in the TX ring are not
    /// considered.
    pub fn tx_done(&self) -> bool {
        self.dev.irq_tx_complete()
    }

    /// Report which of `requested` hold
    ///
    /// Write readiness is always reported because writes never block.
    /// Read readiness is never reported; use [`Uart::any`] or
    /// [`embedded_io::ReadReady`] instead.
    pub fn poll(&self, requested: PollFlags) -> PollFlags {
        let mut ready = PollFlags::empty();
        if requested.contains(PollFlags::WR) {
            ready |= PollFlags::WR;
        }
        ready
    }

    /// Handle a stream control request
    pub fn ioctl(&mut self, request: Ioctl) -> Result<usize, UartError> {
        match request {
            Ioctl::Poll(flags) => Ok(self.poll(flags).bits() as usize),
            Ioctl::Other(_) => Err(UartError::InvalidRequest),
        }
    }

    /// RX bytes discarded because the RX ring was full
    pub fn dropped(&self) -> usize {
        self.state.dropped.load(Ordering::Relaxed)
    }

    /// Settings of the last successful `init`
    pub fn settings(&self) -> &UartSettings {
        &self.settings
    }

    /// The underlying device
    pub fn device(&self) -> &'static D {
        self.dev
    }
}

impl<D: UartDevice + 'static> Drop for Uart<D> {
    fn drop(&mut self) {
        self.teardown();
        self.state.unclaim();
    }
}

impl<D: UartDevice + 'static> fmt::Display for Uart<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.dev.config();
        write!(
            f,
            "UART(\"{}\", baudrate={}, data_bits={}, parity={}, stop={}, flow_control={}, \
             tx_buf={}, rx_buf={}, timeout={}, timeout_char={})",
            self.dev.name(),
            config.baudrate,
            config.data_bits,
            config.parity,
            config.stop_bits,
            config.flow_control,
            self.state.tx.capacity(),
            self.state.rx.capacity(),
            self.settings.timeout,
            self.settings.timeout_char,
        )
    }
}

impl<D: UartDevice + 'static> embedded_io::ErrorType for Uart<D> {
    type Error = UartError;
}

impl<D: UartDevice + 'static> embedded_io::ReadReady for Uart<D> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.any() > 0)
    }
}

impl<D: UartDevice + 'static> embedded_io::WriteReady for Uart<D> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_hal::Device;
    use machina_hal_sim::{SimUart, FIFO_DEPTH};
    use proptest::prelude::*;

    use crate::registry::DeviceTable;

    #[test]
    fn test_default_init_arms_rx_only() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();

        assert!(DEV.is_configured());
        assert!(DEV.has_callback());
        assert!(DEV.rx_irq_enabled());
        assert!(!DEV.tx_irq_enabled());
        assert_eq!(uart.any(), 0);
        assert_eq!(STATE.rx.capacity(), DEFAULT_BUFFER_SIZE);
        assert_eq!(STATE.tx.capacity(), DEFAULT_BUFFER_SIZE);
        assert!(STATE.is_claimed());
    }

    #[test]
    fn test_invalid_bits_touches_nothing() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default().bits(4);

        assert_eq!(
            Uart::new(&DEV, &STATE, settings).err(),
            Some(UartError::InvalidDataBits(4))
        );
        assert!(!DEV.is_configured());
        assert!(!DEV.has_callback());
        assert_eq!(DEV.irq_toggles(), 0);
        assert!(!STATE.rx.is_allocated());
        assert!(!STATE.tx.is_allocated());
        assert!(!STATE.is_claimed());

        let uart = Uart::new(&DEV, &STATE, UartSettings::default());
        assert!(uart.is_ok());
    }

    #[test]
    fn test_invalid_reinit_keeps_running_port() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();

        assert_eq!(
            uart.init(UartSettings::default().stop(3)),
            Err(UartError::InvalidStopBits(3))
        );
        assert!(DEV.rx_irq_enabled());
        assert!(STATE.rx.is_allocated());
        assert_eq!(uart.settings(), &UartSettings::default());
    }

    #[test]
    fn test_partial_write_then_remainder() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        let payload: [u8; 200] = core::array::from_fn(|i| i as u8);

        let sent = uart.write(&payload);
        assert_eq!(sent, 128);
        assert!(DEV.tx_irq_enabled());

        DEV.pump();
        assert_eq!(DEV.take_transmitted(), &payload[..128]);
        assert!(!DEV.tx_irq_enabled());
        assert!(uart.tx_done());

        assert_eq!(uart.write(&payload[sent..]), 72);
        DEV.pump();
        assert_eq!(DEV.take_transmitted(), &payload[128..]);
    }

    #[test]
    fn test_empty_write_is_noop() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        let toggles = DEV.irq_toggles();

        assert_eq!(uart.write(&[]), 0);
        assert_eq!(DEV.irq_toggles(), toggles);
        assert!(!DEV.tx_irq_enabled());
    }

    #[test]
    fn test_read_empty_leaves_interrupts_alone() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        let toggles = DEV.irq_toggles();
        let mut buf = [0u8; 16];

        assert_eq!(uart.read(&mut buf), 0);
        assert_eq!(DEV.irq_toggles(), toggles);
        assert!(DEV.rx_irq_enabled());
    }

    #[test]
    fn test_receive_and_read() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();

        DEV.receive(b"hello");
        DEV.pump();
        assert_eq!(uart.any(), 5);

        let mut buf = [0u8; 3];
        assert_eq!(uart.read(&mut buf), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(uart.read(&mut buf), 2);
        assert_eq!(&buf[..2], b"lo");
        assert!(DEV.rx_irq_enabled());
    }

    #[test]
    fn test_rx_overflow_drops_and_recovers() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default().rxbuf(2 * FIFO_DEPTH);
        let mut uart = Uart::new(&DEV, &STATE, settings).unwrap();
        let chunk = [0x55u8; FIFO_DEPTH];

        for _ in 0..3 {
            DEV.receive(&chunk);
            DEV.pump();
        }
        assert_eq!(uart.any(), 2 * FIFO_DEPTH);
        assert!(!DEV.rx_irq_enabled());
        assert_eq!(uart.dropped(), FIFO_DEPTH);
        assert_eq!(DEV.rx_fifo_len(), 0);

        let mut buf = [0u8; 4];
        assert_eq!(uart.read(&mut buf), 4);
        assert!(DEV.rx_irq_enabled());

        DEV.receive(b"xy");
        DEV.pump();
        assert_eq!(uart.any(), 2 * FIFO_DEPTH - 2);
    }

    #[test]
    fn test_deinit_is_idempotent() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        DEV.receive(b"ok");
        DEV.pump();

        uart.deinit();
        uart.deinit();
        assert!(!DEV.rx_irq_enabled());
        assert!(!DEV.tx_irq_enabled());

        assert_eq!(uart.write(b"late"), 0);
        let mut buf = [0u8; 4];
        assert_eq!(uart.read(&mut buf), 2);
        assert!(!DEV.rx_irq_enabled());

        uart.init(UartSettings::default()).unwrap();
        assert!(DEV.rx_irq_enabled());
    }

    #[test]
    fn test_config_failure_leaves_no_buffers() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        DEV.set_reject_config(true);

        assert_eq!(
            Uart::new(&DEV, &STATE, UartSettings::default()).err(),
            Some(UartError::ConfigFailed)
        );
        assert!(!STATE.rx.is_allocated());
        assert!(!STATE.tx.is_allocated());
        assert!(!DEV.has_callback());
    }

    #[test]
    fn test_reinit_failure_deinitialises_port() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        DEV.set_reject_config(true);

        assert_eq!(uart.init(UartSettings::default()), Err(UartError::ConfigFailed));
        assert!(!DEV.rx_irq_enabled());
        assert!(!DEV.has_callback());
        assert!(!STATE.rx.is_allocated());
        assert_eq!(uart.write(b"x"), 0);

        DEV.set_reject_config(false);
        uart.init(UartSettings::default()).unwrap();
        assert_eq!(uart.write(b"x"), 1);
    }

    #[test]
    fn test_out_of_memory() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default().rxbuf(usize::MAX);

        assert_eq!(
            Uart::new(&DEV, &STATE, settings).err(),
            Some(UartError::OutOfMemory)
        );
        assert!(!STATE.rx.is_allocated());
        assert!(!STATE.tx.is_allocated());
        assert!(!DEV.rx_irq_enabled());
    }

    #[test]
    fn test_tx_alloc_failure_releases_rx() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();

        assert_eq!(
            uart.init(UartSettings::default().txbuf(usize::MAX)),
            Err(UartError::OutOfMemory)
        );
        assert!(!STATE.rx.is_allocated());
        assert!(!STATE.tx.is_allocated());
        assert!(!DEV.has_callback());
        assert_eq!(uart.write(b"x"), 0);
    }

    #[test]
    fn test_descriptor_after_failed_reinit() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        let settings = UartSettings::default()
            .baudrate(9600)
            .rxbuf(64)
            .txbuf(usize::MAX);

        assert_eq!(uart.init(settings), Err(UartError::OutOfMemory));
        let descriptor = uart.to_string();
        assert!(descriptor.contains("baudrate=9600"));
        assert!(descriptor.contains("tx_buf=0, rx_buf=0"));
    }

    #[test]
    fn test_reinit_resizes_buffers() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        DEV.receive(b"stale");
        DEV.pump();

        uart.init(UartSettings::default().rxbuf(64).txbuf(256).baudrate(9600))
            .unwrap();
        assert_eq!(STATE.rx.capacity(), 64);
        assert_eq!(STATE.tx.capacity(), 256);
        assert_eq!(uart.any(), 0);
        assert_eq!(DEV.config().baudrate, 9600);
        assert!(DEV.rx_irq_enabled());
    }

    #[test]
    fn test_second_claim_is_busy() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let first = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();

        assert_eq!(
            Uart::new(&DEV, &STATE, UartSettings::default()).err(),
            Some(UartError::Busy)
        );
        assert!(STATE.rx.is_allocated());

        drop(first);
        assert!(Uart::new(&DEV, &STATE, UartSettings::default()).is_ok());
    }

    #[test]
    fn test_drop_tears_down() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        drop(uart);

        assert!(!STATE.is_claimed());
        assert!(!DEV.has_callback());
        assert!(!DEV.rx_irq_enabled());
        assert!(!STATE.rx.is_allocated());
        assert!(!STATE.tx.is_allocated());
    }

    #[test]
    fn test_descriptor() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default()
            .baudrate(9600)
            .parity(ParityArg::EVEN)
            .stop(2)
            .txbuf(64)
            .timeout(10)
            .timeout_char(2);
        let uart = Uart::new(&DEV, &STATE, settings).unwrap();

        assert_eq!(
            uart.to_string(),
            "UART(\"uart0\", baudrate=9600, data_bits=8, parity=Even, stop=2, \
             flow_control=None, tx_buf=64, rx_buf=128, timeout=10, timeout_char=2)"
        );
    }

    #[test]
    fn test_poll_and_ioctl() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        DEV.receive(b"a");
        DEV.pump();

        assert_eq!(uart.poll(PollFlags::RD | PollFlags::WR), PollFlags::WR);
        assert_eq!(uart.poll(PollFlags::RD), PollFlags::empty());
        assert_eq!(
            uart.ioctl(Ioctl::Poll(PollFlags::WR)),
            Ok(PollFlags::WR.bits() as usize)
        );
        assert_eq!(uart.ioctl(Ioctl::Other(42)), Err(UartError::InvalidRequest));

        use embedded_io::{ReadReady, WriteReady};
        assert_eq!(uart.read_ready(), Ok(true));
        assert_eq!(uart.write_ready(), Ok(true));
    }

    #[test]
    fn test_open_by_name() {
        static DEV: SimUart = SimUart::new("uart1");
        static STATE: State = State::new();
        let mut table: DeviceTable<SimUart, 2> = DeviceTable::new();
        table.register(&DEV).unwrap();

        assert_eq!(
            Uart::<SimUart>::open(&table, "uart9", &STATE, UartSettings::default()).err(),
            Some(UartError::DeviceNotFound)
        );
        assert!(!STATE.is_claimed());

        let uart = Uart::<SimUart>::open(&table, "uart1", &STATE, UartSettings::default()).unwrap();
        assert_eq!(uart.device().name(), "uart1");
    }

    #[test]
    fn test_zero_sized_rx_buffer_drops_everything() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default().rxbuf(0)).unwrap();

        DEV.receive(b"abc");
        DEV.pump();
        assert_eq!(uart.any(), 0);
        assert_eq!(uart.dropped(), 3);
        let mut buf = [0u8; 4];
        assert_eq!(uart.read(&mut buf), 0);
    }

    proptest! {
        #[test]
        fn test_chunked_writes_reassemble(
            payload in proptest::collection::vec(any::<u8>(), 0..600),
            txbuf in 1usize..96,
        ) {
            static DEV: SimUart = SimUart::new("uart0");
            static STATE: State = State::new();
            let mut uart = Uart::new(&DEV, &STATE, UartSettings::default().txbuf(txbuf)).unwrap();
            DEV.take_transmitted();

            let mut sent = 0;
            while sent < payload.len() {
                let n = uart.write(&payload[sent..]);
                prop_assert!(n <= txbuf);
                prop_assert!(n > 0);
                sent += n;
                DEV.pump();
            }
            prop_assert_eq!(DEV.take_transmitted(), payload);
        }
    }
}
