//! Reads bounded by the port's `timeout` and `timeout_char`
//!
//! The transport itself never blocks. These helpers run in the caller's
//! context and poll [`Uart::any`] against a [`Clock`] until the deadline
//! passes or the buffer is full.

use machina_hal::{Clock, UartDevice};

use super::Uart;

/// Read into `buf`, waiting per the port's timeouts
///
/// Busy-polls between checks. See [`read_deadline_with`].
pub fn read_deadline<D, C>(uart: &mut Uart<D>, buf: &mut [u8], clock: &C) -> usize
where
    D: UartDevice + 'static,
    C: Clock + ?Sized,
{
    read_deadline_with(uart, buf, clock, core::hint::spin_loop)
}

/// Read into `buf`, calling `idle` between polls
///
/// Waits up to `timeout` ms for the first byte, then keeps going while
/// each further byte shows up within `timeout_char` ms of the previous
/// one. A timeout of 0 means take what is there and return. Returns the
/// number of bytes read.
pub fn read_deadline_with<D, C, F>(
    uart: &mut Uart<D>,
    buf: &mut [u8],
    clock: &C,
    mut idle: F,
) -> usize
where
    D: UartDevice + 'static,
    C: Clock + ?Sized,
    F: FnMut(),
{
    let settings = *uart.settings();
    let mut filled = uart.read(buf);
    let mut wait = if filled == 0 {
        settings.timeout
    } else {
        settings.timeout_char
    };
    let mut since = clock.now_ms();

    while filled < buf.len() {
        if uart.any() > 0 {
            filled += uart.read(&mut buf[filled..]);
            wait = settings.timeout_char;
            since = clock.now_ms();
            continue;
        }
        if clock.now_ms().saturating_sub(since) >= u64::from(wait) {
            break;
        }
        idle();
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uart::{State, UartSettings};
    use machina_hal_sim::{ManualClock, SimUart};

    #[test]
    fn test_zero_timeout_returns_immediately() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        let clock = ManualClock::new(0, 1);
        let mut idles = 0;
        let mut buf = [0u8; 8];

        let n = read_deadline_with(&mut uart, &mut buf, &clock, || idles += 1);
        assert_eq!(n, 0);
        assert_eq!(idles, 0);
    }

    #[test]
    fn test_takes_buffered_bytes_without_waiting() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let mut uart = Uart::new(&DEV, &STATE, UartSettings::default()).unwrap();
        DEV.receive(b"abc");
        DEV.pump();

        let clock = ManualClock::new(0, 1);
        let mut buf = [0u8; 8];
        let n = read_deadline(&mut uart, &mut buf, &clock);
        assert_eq!(&buf[..n], b"abc");
    }

    #[test]
    fn test_waits_for_first_byte() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default().timeout(100).timeout_char(5);
        let mut uart = Uart::new(&DEV, &STATE, settings).unwrap();
        let clock = ManualClock::new(0, 1);
        let mut idles = 0;
        let mut buf = [0u8; 8];

        let n = read_deadline_with(&mut uart, &mut buf, &clock, || {
            idles += 1;
            if idles == 3 {
                DEV.receive(b"hi");
                DEV.pump();
            }
        });
        assert_eq!(&buf[..n], b"hi");
    }

    #[test]
    fn test_gives_up_after_timeout() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default().timeout(10);
        let mut uart = Uart::new(&DEV, &STATE, settings).unwrap();
        let clock = ManualClock::new(0, 1);
        let mut idles = 0;
        let mut buf = [0u8; 4];

        let n = read_deadline_with(&mut uart, &mut buf, &clock, || idles += 1);
        assert_eq!(n, 0);
        assert_eq!(idles, 9);
    }

    #[test]
    fn test_stops_when_buffer_full() {
        static DEV: SimUart = SimUart::new("uart0");
        static STATE: State = State::new();
        let settings = UartSettings::default().timeout(1000).timeout_char(1000);
        let mut uart = Uart::new(&DEV, &STATE, settings).unwrap();
        DEV.receive(b"abcdef");
        DEV.pump();

        let clock = ManualClock::new(0, 1);
        let mut buf = [0u8; 4];
        let n = read_deadline(&mut uart, &mut buf, &clock);
        assert_eq!(n, 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(uart.any(), 2);
    }
}
