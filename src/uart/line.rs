//! Line editing over a circular receive buffer.
//!
//! The receiver DMA runs in circular mode and writes into `rx` forever; all
//! the reader needs is the index the DMA will write next. Most DMA
//! controllers expose a down-counter of remaining transfers instead, see
//! [`write_index`].

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;
const ESCAPE: u8 = 0x1b;

/// Convert a DMA "remaining transfers" counter into the next write index.
pub fn write_index(rx_len: usize, remaining: usize) -> usize {
    if rx_len == 0 || remaining > rx_len {
        return 0;
    }
    (rx_len - remaining) % rx_len
}

/// Collects typed characters into lines of at most `N` bytes.
pub struct LineReader<const N: usize> {
    line: [u8; N],
    len: usize,
    read: usize,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            line: [0; N],
            len: 0,
            read: 0,
        }
    }

    /// Bytes of the line typed so far.
    pub fn pending(&self) -> &[u8] {
        &self.line[..self.len]
    }

    /// Consume received bytes up to `write` and return the next complete line.
    ///
    /// Stops right after the first line terminator, so remaining input is
    /// picked up by the next call. Empty lines are skipped. Printable bytes
    /// beyond `N` are dropped.
    pub fn poll(&mut self, rx: &[u8], write: usize) -> Option<&[u8]> {
        if rx.is_empty() || write >= rx.len() {
            return None;
        }
        if self.read >= rx.len() {
            self.read = 0;
        }

        while self.read != write {
            let byte = rx[self.read];
            self.read += 1;
            if self.read == rx.len() {
                self.read = 0;
            }

            match byte {
                b'\r' | b'\n' => {
                    if self.len > 0 {
                        let n = self.len;
                        self.len = 0;
                        return Some(&self.line[..n]);
                    }
                }
                BACKSPACE | DELETE => self.len = self.len.saturating_sub(1),
                ESCAPE => self.len = 0,
                b' '..=b'~' => {
                    if self.len < N {
                        self.line[self.len] = byte;
                        self.len += 1;
                    }
                }
                _ => {}
            }
        }

        None
    }

    /// Drop everything received so far, including a partial line.
    ///
    /// `write` is taken modulo `rx_len`, the length of the receive buffer
    /// later passed to [`LineReader::poll`].
    pub fn flush(&mut self, rx_len: usize, write: usize) {
        self.read = if rx_len == 0 { 0 } else { write % rx_len };
        self.len = 0;
    }
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(rx: &mut [u8], at: usize, data: &[u8]) -> usize {
        let mut w = at;
        for &b in data {
            rx[w] = b;
            w = (w + 1) % rx.len();
        }
        w
    }

    #[test]
    fn write_index_counts_down() {
        assert_eq!(write_index(16, 16), 0);
        assert_eq!(write_index(16, 10), 6);
        assert_eq!(write_index(16, 0), 0);
        assert_eq!(write_index(0, 0), 0);
    }

    #[test]
    fn returns_complete_lines_only() {
        let mut rx = [0u8; 32];
        let mut reader = LineReader::<16>::new();

        let w = feed(&mut rx, 0, b"hel");
        assert_eq!(reader.poll(&rx, w), None);
        assert_eq!(reader.pending(), b"hel");

        let w = feed(&mut rx, w, b"lo\r\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"hello"[..]));
        assert_eq!(reader.poll(&rx, w), None);
    }

    #[test]
    fn two_lines_in_one_burst() {
        let mut rx = [0u8; 32];
        let mut reader = LineReader::<16>::new();

        let w = feed(&mut rx, 0, b"ab\ncd\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"ab"[..]));
        assert_eq!(reader.poll(&rx, w), Some(&b"cd"[..]));
        assert_eq!(reader.poll(&rx, w), None);
    }

    #[test]
    fn editing_keys() {
        let mut rx = [0u8; 32];
        let mut reader = LineReader::<16>::new();

        let w = feed(&mut rx, 0, b"abx\x08c\x1bok\x7fk\t\r");
        assert_eq!(reader.poll(&rx, w), Some(&b"ok"[..]));
    }

    #[test]
    fn wraps_around_receive_buffer() {
        let mut rx = [0u8; 8];
        let mut reader = LineReader::<16>::new();

        let w = feed(&mut rx, 0, b"12345\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"12345"[..]));

        let w = feed(&mut rx, w, b"abcdef\n");
        assert_eq!(w, 5);
        assert_eq!(reader.poll(&rx, w), Some(&b"abcdef"[..]));
    }

    #[test]
    fn long_lines_are_truncated() {
        let mut rx = [0u8; 32];
        let mut reader = LineReader::<4>::new();

        let w = feed(&mut rx, 0, b"abcdefg\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"abcd"[..]));
    }

    #[test]
    fn flush_discards_pending_input() {
        let mut rx = [0u8; 32];
        let mut reader = LineReader::<16>::new();

        let w = feed(&mut rx, 0, b"garbage");
        reader.poll(&rx, w);
        let w = feed(&mut rx, w, b"more\n");
        reader.flush(rx.len(), w);
        assert!(reader.pending().is_empty());

        let w = feed(&mut rx, w, b"ok\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"ok"[..]));
    }

    #[test]
    fn flush_past_the_end_wraps() {
        let mut rx = [0u8; 8];
        let mut reader = LineReader::<16>::new();

        reader.flush(rx.len(), 11);
        let w = feed(&mut rx, 3, b"hi\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"hi"[..]));

        reader.flush(0, 5);
        let w = feed(&mut rx, 0, b"yo\n");
        assert_eq!(reader.poll(&rx, w), Some(&b"yo"[..]));
    }

    #[test]
    fn shorter_receive_buffer_restarts_at_zero() {
        let mut big = [0u8; 16];
        let mut small = [0u8; 4];
        let mut reader = LineReader::<16>::new();

        let w = feed(&mut big, 0, b"abcdefghij\n");
        assert_eq!(reader.poll(&big, w), Some(&b"abcdefghij"[..]));

        let w = feed(&mut small, 0, b"ok\n");
        assert_eq!(reader.poll(&small, w), Some(&b"ok"[..]));
    }
}
