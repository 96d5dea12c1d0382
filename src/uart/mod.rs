//! Non-blocking transmit path of a debug UART.
//!
//! Bytes are queued in a [`Ringbuffer`] by the task-side [`Sender`] and
//! drained by a [`TransferEngine`] one contiguous run at a time. The
//! interrupt handler of the engine drives the queue forward through
//! [`Completion::on_transfer_complete`].
//!
//! ```text
//!            send()                    on_transfer_complete()
//!   Idle ──────────────► Transferring ◄──────────────┐
//!    ▲  (chunk started)       │   (more bytes queued) │
//!    │                        └───────────────────────┘
//!    └──────────── ring empty on completion ──────────┘
//! ```

use core::cell::RefCell;
use core::fmt;
use core::future::poll_fn;
use core::task::Poll;

use critical_section::{CriticalSection, Mutex};
use embassy_sync::waitqueue::AtomicWaker;
use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::dma::{Error, Ringbuffer, TransferEngine};

pub mod line;

pub use line::LineReader;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// The engine has no outstanding request.
    Idle,
    /// The engine is moving one chunk.
    Transferring,
}

impl State {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => State::Idle,
            _ => State::Transferring,
        }
    }
}

/// Transmit queue shared between one [`Sender`] and one [`Completion`].
///
/// Create it once at startup, keep it alive for the rest of the program and
/// hand out the two roles with [`UartTx::split`].
pub struct UartTx<'a, E: TransferEngine> {
    ring: Ringbuffer<'a>,
    engine: Mutex<RefCell<E>>,
    state: AtomicU8,
    in_flight: AtomicUsize,
    waker: AtomicWaker,
}

impl<'a, E: TransferEngine> UartTx<'a, E> {
    /// Fails with [`Error::Init`] if `storage` is empty.
    pub fn new(storage: &'a mut [u8], engine: E) -> Result<Self, Error> {
        Ok(Self::from_ringbuffer(Ringbuffer::new(storage)?, engine))
    }

    pub fn from_ringbuffer(ring: Ringbuffer<'a>, engine: E) -> Self {
        Self {
            ring,
            engine: Mutex::new(RefCell::new(engine)),
            state: AtomicU8::new(State::Idle as u8),
            in_flight: AtomicUsize::new(0),
            waker: AtomicWaker::new(),
        }
    }

    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn ringbuffer(&self) -> &Ringbuffer<'a> {
        &self.ring
    }

    /// Length of the chunk the engine is currently reading, 0 when idle.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Bytes that can be queued without landing on the chunk in flight.
    pub fn room(&self) -> usize {
        self.ring.free().saturating_sub(self.in_flight())
    }

    /// Run `f` with exclusive access to the transfer engine.
    ///
    /// Transfers cannot start while `f` runs: a [`Sender::send`] or
    /// [`Sender::kick`] issued from inside `f` only queues its bytes.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            f(&mut *engine)
        })
    }

    /// Hand out the producer and the completion roles.
    pub fn split(&mut self) -> (Sender<'_, 'a, E>, Completion<'_, 'a, E>) {
        (Sender { uart: self }, Completion { uart: self })
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    // Only ever called with `cs` held, so the producer side (engine idle) and
    // the completion side never extract at the same time.
    fn dispatch(&self, cs: CriticalSection<'_>) -> bool {
        // Held by `with_engine`; leave the bytes queued.
        let Ok(mut engine) = self.engine.borrow(cs).try_borrow_mut() else {
            return false;
        };

        let chunk = unsafe { self.ring.extract_shared() };
        if chunk.is_empty() {
            return false;
        }

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "uart tx: start {} bytes at offset {}",
            chunk.len(),
            chunk.offset()
        );

        self.in_flight.store(chunk.len(), Ordering::Release);
        engine.start_transfer(chunk);
        true
    }

    /// Start a transfer if the engine is idle and bytes are queued.
    fn kick(&self) -> bool {
        critical_section::with(|cs| {
            if self.state() != State::Idle {
                return false;
            }

            if self.dispatch(cs) {
                self.set_state(State::Transferring);
                true
            } else {
                false
            }
        })
    }

    fn complete(&self) {
        critical_section::with(|cs| {
            // Nothing was outstanding, so nothing can have completed.
            if self.state() == State::Idle {
                return;
            }

            self.in_flight.store(0, Ordering::Release);
            if !self.dispatch(cs) {
                #[cfg(feature = "defmt")]
                defmt::trace!("uart tx: idle");

                self.set_state(State::Idle);
            }
        });

        self.waker.wake();
    }
}

/// Task-side producer of a [`UartTx`].
pub struct Sender<'q, 'a, E: TransferEngine> {
    uart: &'q UartTx<'a, E>,
}

impl<'q, 'a, E: TransferEngine> Sender<'q, 'a, E> {
    pub fn uart(&self) -> &'q UartTx<'a, E> {
        self.uart
    }

    /// Queue `data` and start a transfer if the engine is idle.
    ///
    /// Bytes queued while a transfer is running go out with a later chunk.
    /// Fails with [`Error::Overflow`] without queuing anything when `data`
    /// does not fit; dropping or retrying is up to the caller.
    pub fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.push(data)?;
        self.uart.kick();
        Ok(())
    }

    /// Queue `data` without touching the engine.
    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        let res = unsafe { self.uart.ring.push_shared(data) };

        #[cfg(feature = "defmt")]
        if res.is_err() {
            defmt::warn!(
                "uart tx: rejected {} bytes, {} free",
                data.len(),
                self.uart.ring.free()
            );
        }

        res
    }

    /// Start a transfer of queued bytes if the engine is idle.
    ///
    /// Returns `true` when a transfer was started.
    pub fn kick(&mut self) -> bool {
        self.uart.kick()
    }

    /// Free slots in the ring, including the ones the chunk in flight still
    /// occupies.
    pub fn free(&self) -> usize {
        self.uart.ring.free()
    }

    pub fn room(&self) -> usize {
        self.uart.room()
    }

    pub fn state(&self) -> State {
        self.uart.state()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == State::Idle
    }

    /// Queue as much of `buf` as fits, waiting for room if the ring is full.
    ///
    /// Unlike [`Sender::send`], this never writes over the chunk the engine
    /// is still reading; it waits for the completion instead.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        let uart = self.uart;
        poll_fn(|cx| {
            uart.waker.register(cx.waker());

            uart.kick();
            let n = buf.len().min(uart.room());

            if n == 0 {
                return Poll::Pending;
            }

            if let Err(e) = unsafe { uart.ring.push_shared(&buf[..n]) } {
                return Poll::Ready(Err(e));
            }
            uart.kick();

            Poll::Ready(Ok(n))
        })
        .await
    }

    /// Wait until every queued byte has been handed to the engine and the
    /// last transfer has completed.
    pub async fn flush(&mut self) {
        let uart = self.uart;
        uart.kick();

        poll_fn(|cx| {
            uart.waker.register(cx.waker());

            if uart.state() == State::Idle {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

impl<'q, 'a, E: TransferEngine> fmt::Write for Sender<'q, 'a, E> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.send(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<'q, 'a, E: TransferEngine> embedded_io_async::ErrorType for Sender<'q, 'a, E> {
    type Error = Error;
}

impl<'q, 'a, E: TransferEngine> embedded_io_async::Write for Sender<'q, 'a, E> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        Self::write(self, buf).await
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Self::flush(self).await;
        Ok(())
    }
}

/// Interrupt-side consumer of a [`UartTx`].
pub struct Completion<'q, 'a, E: TransferEngine> {
    uart: &'q UartTx<'a, E>,
}

impl<'q, 'a, E: TransferEngine> Completion<'q, 'a, E> {
    pub fn uart(&self) -> &'q UartTx<'a, E> {
        self.uart
    }

    /// Call from the engine's interrupt handler when the current chunk has
    /// gone out.
    ///
    /// Starts the next chunk if bytes are queued, otherwise returns the queue
    /// to [`State::Idle`].
    pub fn on_transfer_complete(&mut self) {
        self.uart.complete();
    }
}
