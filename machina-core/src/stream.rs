//! Stream-protocol types shared with the scripting bindings
//!
//! Poll bits follow the POSIX `poll()` layout so the binding layer can
//! pass its request words through unchanged.

bitflags::bitflags! {
    /// Readiness conditions for [`Ioctl::Poll`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PollFlags: u16 {
        /// Data can be read without waiting
        const RD = 0x0001;
        /// Data can be written without waiting
        const WR = 0x0004;
        /// Error condition
        const ERR = 0x0008;
        /// Peer hung up
        const HUP = 0x0010;
    }
}

/// Control requests accepted by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ioctl {
    /// Report which of the given conditions currently hold
    Poll(PollFlags),
    /// Any request code this stream does not implement
    Other(u32),
}
