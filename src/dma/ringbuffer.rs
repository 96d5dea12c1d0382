use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use portable_atomic::{AtomicUsize, Ordering};

use super::{Chunk, Error};

/// Fixed-capacity byte ring over caller-owned storage.
///
/// `head` is only ever written by the producer and `tail` only by the
/// consumer. `count` is shared: the producer only increments it and the
/// consumer only decrements it, each with a single atomic RMW. With `&mut`
/// access every operation is available directly; [`Ringbuffer::split`] hands
/// the two roles to separate execution contexts.
pub struct Ringbuffer<'a> {
    buffer: NonNull<u8>,
    capacity: usize,

    head: AtomicUsize,
    tail: AtomicUsize,
    count: AtomicUsize,

    _storage: PhantomData<&'a mut [u8]>,
}

// The storage is only reached through the head/tail protocol below.
unsafe impl Send for Ringbuffer<'_> {}
unsafe impl Sync for Ringbuffer<'_> {}

#[inline(always)]
fn wrap(index: usize, capacity: usize) -> usize {
    if index >= capacity {
        index - capacity
    } else {
        index
    }
}

impl<'a> Ringbuffer<'a> {
    /// Use all of `storage` as the ring.
    ///
    /// Fails with [`Error::Init`] if `storage` is empty.
    pub fn new(storage: &'a mut [u8]) -> Result<Self, Error> {
        let capacity = storage.len();
        Self::with_capacity(storage, capacity)
    }

    /// Use the first `capacity` bytes of `storage` as the ring.
    ///
    /// Fails with [`Error::Init`] if `capacity` is zero or larger than
    /// `storage`.
    pub fn with_capacity(storage: &'a mut [u8], capacity: usize) -> Result<Self, Error> {
        if capacity == 0 || capacity > storage.len() {
            return Err(Error::Init);
        }

        Ok(Self {
            buffer: NonNull::from(storage).cast::<u8>(),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
            _storage: PhantomData,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of unread bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.capacity - self.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Next write index.
    #[inline]
    pub fn head(&self) -> usize {
        self.head.load(Ordering::Relaxed)
    }

    /// Next read index.
    #[inline]
    pub fn tail(&self) -> usize {
        self.tail.load(Ordering::Relaxed)
    }

    /// Start of the backing storage.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    /// Copy all of `data` in, or nothing.
    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        unsafe { self.push_shared(data) }
    }

    /// Copy exactly `out.len()` bytes out, or nothing.
    pub fn pop(&mut self, out: &mut [u8]) -> Result<(), Error> {
        unsafe { self.pop_shared(out) }
    }

    /// Take the longest unread run that does not cross the end of storage.
    ///
    /// The run is consumed immediately. A wrapped region comes out in two
    /// calls.
    pub fn extract_contiguous(&mut self) -> Chunk<'a> {
        unsafe { self.extract_shared() }
    }

    /// Split into the producer and consumer roles.
    pub fn split(&mut self) -> (Producer<'_, 'a>, Consumer<'_, 'a>) {
        (Producer { ring: self }, Consumer { ring: self })
    }

    /// # Safety
    ///
    /// Only one context may act as the producer at a time.
    pub(crate) unsafe fn push_shared(&self, data: &[u8]) -> Result<(), Error> {
        let len = data.len();
        let count = self.count.load(Ordering::Acquire);

        if len > self.capacity - count {
            return Err(Error::Overflow);
        }

        if len == 0 {
            return Ok(());
        }

        let head = self.head.load(Ordering::Relaxed);
        let first = len.min(self.capacity - head);
        let buf = self.buffer.as_ptr();

        ptr::copy_nonoverlapping(data.as_ptr(), buf.add(head), first);
        ptr::copy_nonoverlapping(data.as_ptr().add(first), buf, len - first);

        self.head
            .store(wrap(head + len, self.capacity), Ordering::Relaxed);
        self.count.fetch_add(len, Ordering::Release);

        Ok(())
    }

    /// # Safety
    ///
    /// Only one context may act as the consumer at a time.
    pub(crate) unsafe fn pop_shared(&self, out: &mut [u8]) -> Result<(), Error> {
        let len = out.len();
        let count = self.count.load(Ordering::Acquire);

        if len > count {
            return Err(Error::Underflow);
        }

        if len == 0 {
            return Ok(());
        }

        let tail = self.tail.load(Ordering::Relaxed);
        let first = len.min(self.capacity - tail);
        let buf = self.buffer.as_ptr() as *const u8;

        ptr::copy_nonoverlapping(buf.add(tail), out.as_mut_ptr(), first);
        ptr::copy_nonoverlapping(buf, out.as_mut_ptr().add(first), len - first);

        self.tail
            .store(wrap(tail + len, self.capacity), Ordering::Relaxed);
        self.count.fetch_sub(len, Ordering::Release);

        Ok(())
    }

    /// # Safety
    ///
    /// Only one context may act as the consumer at a time.
    pub(crate) unsafe fn extract_shared(&self) -> Chunk<'a> {
        let buf = self.buffer.as_ptr() as *const u8;
        let count = self.count.load(Ordering::Acquire);

        if count == 0 {
            return Chunk::empty(buf);
        }

        let tail = self.tail.load(Ordering::Relaxed);
        let run = count.min(self.capacity - tail);

        self.tail
            .store(wrap(tail + run, self.capacity), Ordering::Relaxed);
        self.count.fetch_sub(run, Ordering::Release);

        Chunk::new(buf.add(tail), tail, run)
    }
}

/// Write side of a split [`Ringbuffer`].
pub struct Producer<'r, 'a> {
    ring: &'r Ringbuffer<'a>,
}

impl<'r, 'a> Producer<'r, 'a> {
    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        unsafe { self.ring.push_shared(data) }
    }

    pub fn free(&self) -> usize {
        self.ring.free()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Read side of a split [`Ringbuffer`].
pub struct Consumer<'r, 'a> {
    ring: &'r Ringbuffer<'a>,
}

impl<'r, 'a> Consumer<'r, 'a> {
    pub fn pop(&mut self, out: &mut [u8]) -> Result<(), Error> {
        unsafe { self.ring.pop_shared(out) }
    }

    pub fn extract_contiguous(&mut self) -> Chunk<'a> {
        unsafe { self.ring.extract_shared() }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
