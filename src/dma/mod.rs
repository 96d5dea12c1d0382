use core::fmt;
use core::marker::PhantomData;

pub mod ringbuffer;

pub use ringbuffer::{Consumer, Producer, Ringbuffer};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Backing storage is missing or the requested capacity does not fit it.
    Init,
    /// A push asked for more room than is free.
    Overflow,
    /// A pop asked for more bytes than are stored.
    Underflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("ring buffer storage is missing or too small"),
            Self::Overflow => f.write_str("not enough free space in ring buffer"),
            Self::Underflow => f.write_str("not enough bytes stored in ring buffer"),
        }
    }
}

impl embedded_io_async::Error for Error {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::Overflow => embedded_io_async::ErrorKind::OutOfMemory,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}

/// A contiguous run of unread bytes handed out by the ring buffer.
///
/// The bytes are already counted as consumed when a chunk is returned, so the
/// producer is free to overwrite them once the ring wraps around again. A
/// chunk is only meaningful until the next push that reaches its range.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    ptr: *const u8,
    offset: usize,
    len: usize,
    _storage: PhantomData<&'a [u8]>,
}

impl<'a> Chunk<'a> {
    pub(crate) const fn new(ptr: *const u8, offset: usize, len: usize) -> Self {
        Self {
            ptr,
            offset,
            len,
            _storage: PhantomData,
        }
    }

    pub(crate) const fn empty(base: *const u8) -> Self {
        Self::new(base, 0, 0)
    }

    /// Start address of the run, `storage + offset`.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Index of the first byte inside the backing storage.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the ring had nothing to transfer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the run as a slice.
    ///
    /// # Safety
    ///
    /// The producer must not have pushed over this range since the chunk was
    /// extracted, and must not do so while the returned slice is alive.
    pub unsafe fn as_slice(&self) -> &'a [u8] {
        if self.len == 0 {
            return &[];
        }
        core::slice::from_raw_parts(self.ptr, self.len)
    }
}

/// A transfer engine that copies one contiguous memory range per request
///
/// This is usually a DMA channel wired to a UART transmitter. The engine
/// starts the copy and returns immediately; when the last byte has gone out,
/// the interrupt handler for the engine must call
/// [`Completion::on_transfer_complete`](crate::uart::Completion::on_transfer_complete).
///
/// The memory behind `chunk` stays valid until that notification. Implementors
/// only need to program the source address and the length.
#[auto_impl::auto_impl(&mut)]
pub trait TransferEngine {
    /// Begin an asynchronous copy of `chunk.len()` bytes from `chunk.as_ptr()`.
    ///
    /// Never called with an empty chunk.
    fn start_transfer(&mut self, chunk: Chunk<'_>);
}
