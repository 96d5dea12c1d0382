//! Level-gated front end for the debug UART.
//!
//! The logger adds no framing of its own; it decides whether a line goes out
//! at all and keeps count of the lines the transmit queue had no room for.

use core::fmt::{self, Write as _};

use crate::dma::{Error, TransferEngine};
use crate::uart::Sender;

/// Severity of a log line. Lower values are more severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Firmware version and similar boot banners; printed at every threshold.
    Startup = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Debug = 5,
    Trace = 6,
}

#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    /// Most verbose level that is still sent.
    pub level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Trace,
        }
    }
}

pub struct Logger<'q, 'a, E: TransferEngine> {
    tx: Sender<'q, 'a, E>,
    config: Config,
    dropped: u32,
}

impl<'q, 'a, E: TransferEngine> Logger<'q, 'a, E> {
    pub fn new(tx: Sender<'q, 'a, E>, config: Config) -> Self {
        Self {
            tx,
            config,
            dropped: 0,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn set_level(&mut self, level: Level) {
        self.config.level = level;
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.config.level
    }

    /// Lines rejected because the transmit queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn sender(&mut self) -> &mut Sender<'q, 'a, E> {
        &mut self.tx
    }

    pub fn into_sender(self) -> Sender<'q, 'a, E> {
        self.tx
    }

    /// Send `line` if `level` passes the threshold.
    ///
    /// A line that does not fit is dropped as a whole.
    #[inline]
    pub fn log(&mut self, level: Level, line: &[u8]) -> Result<(), Error> {
        if !self.enabled(level) {
            return Ok(());
        }

        self.tx.send(line).map_err(|e| {
            self.dropped = self.dropped.wrapping_add(1);
            e
        })
    }

    /// Format `args` straight into the transmit queue.
    ///
    /// Each formatted piece is queued separately, so a queue that fills up
    /// halfway through leaves the start of the line queued.
    #[inline]
    pub fn log_fmt(&mut self, level: Level, args: fmt::Arguments<'_>) -> Result<(), Error> {
        if !self.enabled(level) {
            return Ok(());
        }

        self.tx.write_fmt(args).map_err(|_| {
            self.dropped = self.dropped.wrapping_add(1);
            Error::Overflow
        })
    }
}
