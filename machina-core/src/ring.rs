//! Lock-free single-producer/single-consumer byte ring
//!
//! The ring is shared between exactly two parties: one producer that
//! claims free space, fills it and commits, and one consumer that claims
//! filled space, drains it and commits. Each side owns its own cursor;
//! the only state both sides write is the byte count, which is changed
//! with a single atomic add or subtract per commit. No operation blocks.
//!
//! Storage is installed at runtime so the ring can live in a `static`
//! and be (re)sized when a port is (re)configured:
//!
//! ```ignore
//! static RING: RingBuffer = RingBuffer::new();
//! ```
//!
//! Owners with exclusive access use [`RingBuffer::with_capacity`] and
//! [`RingBuffer::split`] and need no `unsafe`.

#![allow(unsafe_code)]

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr;
use core::slice;

use portable_atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Ring storage could not be allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocError;

/// Allocate zeroed ring storage without aborting on exhaustion
pub fn alloc_storage(capacity: usize) -> Result<Box<[u8]>, AllocError> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|_| AllocError)?;
    storage.resize(capacity, 0);
    Ok(storage.into_boxed_slice())
}

/// Fixed-capacity circular byte buffer
pub struct RingBuffer {
    buf: AtomicPtr<u8>,
    cap: AtomicUsize,
    /// Write cursor, only moved by the producer
    head: AtomicUsize,
    /// Read cursor, only moved by the consumer
    tail: AtomicUsize,
    /// Bytes held
    len: AtomicUsize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    /// Create a ring with no storage (capacity 0)
    pub const fn new() -> Self {
        Self {
            buf: AtomicPtr::new(ptr::null_mut()),
            cap: AtomicUsize::new(0),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
        }
    }

    /// Create a ring owning `capacity` bytes of storage
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let ring = Self::new();
        let storage = alloc_storage(capacity)?;
        // SAFETY: `ring` is local, nothing else can observe it
        unsafe { ring.install(storage) };
        Ok(ring)
    }

    /// Total storage in bytes
    pub fn capacity(&self) -> usize {
        self.cap.load(Ordering::Acquire)
    }

    /// Bytes currently held
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Check if no bytes are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if no free space is left
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Check if storage is installed
    pub fn is_allocated(&self) -> bool {
        !self.buf.load(Ordering::Acquire).is_null()
    }

    /// Install `storage` as the ring's backing memory, emptying the ring
    ///
    /// Any previous storage is freed.
    ///
    /// # Safety
    ///
    /// No [`Producer`] or [`Consumer`] for this ring may be alive, and no
    /// other context may access the ring until this returns.
    pub unsafe fn install(&self, storage: Box<[u8]>) {
        self.release();
        let cap = storage.len();
        let raw = Box::into_raw(storage) as *mut u8;
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.len.store(0, Ordering::Relaxed);
        self.cap.store(cap, Ordering::Relaxed);
        self.buf.store(raw, Ordering::Release);
    }

    /// Free the backing memory, leaving an empty ring of capacity 0
    ///
    /// # Safety
    ///
    /// Same contract as [`RingBuffer::install`].
    pub unsafe fn release(&self) {
        let raw = self.buf.swap(ptr::null_mut(), Ordering::AcqRel);
        let cap = self.cap.swap(0, Ordering::Relaxed);
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.len.store(0, Ordering::Relaxed);
        if !raw.is_null() {
            // SAFETY: `raw` and `cap` come from the `Box::into_raw` in `install`
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(raw, cap)));
        }
    }

    /// Split an exclusively owned ring into its two halves
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    /// Obtain the producer half of a shared ring
    ///
    /// # Safety
    ///
    /// At most one `Producer` for this ring may exist at any time, across
    /// all execution contexts.
    pub unsafe fn producer(&self) -> Producer<'_> {
        Producer { ring: self }
    }

    /// Obtain the consumer half of a shared ring
    ///
    /// # Safety
    ///
    /// At most one `Consumer` for this ring may exist at any time, across
    /// all execution contexts.
    pub unsafe fn consumer(&self) -> Consumer<'_> {
        Consumer { ring: self }
    }

    /// Copy in as much of `data` as fits
    pub fn put(&mut self, data: &[u8]) -> usize {
        self.split().0.put(data)
    }

    /// Copy out up to `buf.len()` bytes
    pub fn get(&mut self, buf: &mut [u8]) -> usize {
        self.split().1.get(buf)
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out live halves and other contexts
        unsafe { self.release() }
    }
}

/// Writing half of a [`RingBuffer`]
pub struct Producer<'a> {
    ring: &'a RingBuffer,
}

impl Producer<'_> {
    /// Reserve up to `max` contiguous free bytes
    ///
    /// The region may be shorter than requested, or empty, when the ring
    /// is nearly full or the free space wraps around the end of storage.
    pub fn claim_write(&mut self, max: usize) -> &mut [u8] {
        let ring = self.ring;
        let raw = ring.buf.load(Ordering::Acquire);
        if raw.is_null() {
            return &mut [];
        }
        let cap = ring.cap.load(Ordering::Relaxed);
        let head = ring.head.load(Ordering::Relaxed);
        let free = cap - ring.len.load(Ordering::Acquire);
        let n = free.min(cap - head).min(max);
        // SAFETY: [head, head + n) is inside the storage and lies in the
        // free region, which the consumer never touches
        unsafe { slice::from_raw_parts_mut(raw.add(head), n) }
    }

    /// Publish `n` bytes written into the last claimed region
    pub fn commit_write(&mut self, n: usize) {
        let ring = self.ring;
        let cap = ring.cap.load(Ordering::Relaxed);
        if cap == 0 {
            return;
        }
        let head = ring.head.load(Ordering::Relaxed);
        let free = cap - ring.len.load(Ordering::Acquire);
        let n = n.min(free).min(cap - head);
        ring.head.store((head + n) % cap, Ordering::Relaxed);
        ring.len.fetch_add(n, Ordering::Release);
    }

    /// Copy in as much of `data` as fits, returning the count accepted
    ///
    /// Excess bytes are dropped; a full ring accepts 0.
    pub fn put(&mut self, data: &[u8]) -> usize {
        let mut written = 0;
        // Free space is at most two runs: up to the end, then from the start
        for _ in 0..2 {
            let region = self.claim_write(data.len() - written);
            let n = region.len();
            if n == 0 {
                break;
            }
            region.copy_from_slice(&data[written..written + n]);
            self.commit_write(n);
            written += n;
        }
        written
    }
}

/// Reading half of a [`RingBuffer`]
pub struct Consumer<'a> {
    ring: &'a RingBuffer,
}

impl Consumer<'_> {
    /// Borrow up to `max` contiguous filled bytes
    pub fn claim_read(&mut self, max: usize) -> &[u8] {
        let ring = self.ring;
        let raw = ring.buf.load(Ordering::Acquire);
        if raw.is_null() {
            return &[];
        }
        let cap = ring.cap.load(Ordering::Relaxed);
        let tail = ring.tail.load(Ordering::Relaxed);
        let filled = ring.len.load(Ordering::Acquire);
        let n = filled.min(cap - tail).min(max);
        // SAFETY: [tail, tail + n) is inside the storage and lies in the
        // filled region, which the producer never touches
        unsafe { slice::from_raw_parts(raw.add(tail), n) }
    }

    /// Release `n` bytes from the front of the ring
    pub fn commit_read(&mut self, n: usize) {
        let ring = self.ring;
        let cap = ring.cap.load(Ordering::Relaxed);
        if cap == 0 {
            return;
        }
        let tail = ring.tail.load(Ordering::Relaxed);
        let filled = ring.len.load(Ordering::Acquire);
        let n = n.min(filled).min(cap - tail);
        ring.tail.store((tail + n) % cap, Ordering::Relaxed);
        ring.len.fetch_sub(n, Ordering::Release);
    }

    /// Copy out up to `buf.len()` bytes, returning the count copied
    pub fn get(&mut self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        for _ in 0..2 {
            let region = self.claim_read(buf.len() - read);
            let n = region.len();
            if n == 0 {
                break;
            }
            buf[read..read + n].copy_from_slice(region);
            self.commit_read(n);
            read += n;
        }
        read
    }
}
