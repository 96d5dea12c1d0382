#![no_std]
//! Non-blocking debug UART transmit path.
//!
//! A [`dma::Ringbuffer`] over caller-owned storage queues bytes from task
//! context; a [`dma::TransferEngine`] (usually a DMA channel feeding a UART)
//! drains it one contiguous run at a time. [`uart::UartTx`] ties the two
//! together with an idle/transferring handoff between the task and the
//! completion interrupt.
//!
//! ```ignore
//! static mut TX_STORAGE: [u8; 2048] = [0; 2048];
//!
//! let mut uart = UartTx::new(unsafe { &mut *addr_of_mut!(TX_STORAGE) }, dma_channel)?;
//! let (tx, done) = uart.split();
//! // move `done` to the DMA interrupt handler, keep `tx` in the task
//! ```

#[cfg(test)]
extern crate std;

pub mod dma;
pub mod logger;
pub mod uart;

pub use dma::{Chunk, Error, Ringbuffer, TransferEngine};
pub use uart::{Completion, Sender, State, UartTx};
