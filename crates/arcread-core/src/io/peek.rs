//! Peeking reader with a consumed-byte counter.

use std::io::BufRead;
use std::io::Read;

/// Read chunk size used when refilling the internal buffer.
const CHUNK: usize = 8 * 1024;

/// Wrapper reader that supports peeking ahead without consuming bytes and
/// tracks how many bytes have been handed out.
///
/// Signature detection needs to inspect header bytes of a stream that may
/// not support seeking (it is usually the output of a decompressor), so
/// `PeekReader` buffers exactly what was peeked and replays it on the next
/// read. The consumed-byte counter is what corruption errors report as
/// their offset.
///
/// # Examples
///
/// ```
/// use arcread_core::io::PeekReader;
/// use std::io::Read;
///
/// let mut reader = PeekReader::new(&b"PK\x03\x04rest"[..]);
/// assert_eq!(reader.peek(2)?, b"PK");
/// assert_eq!(reader.position(), 0); // peeking consumes nothing
///
/// let mut sig = [0u8; 4];
/// reader.read_exact(&mut sig)?;
/// assert_eq!(&sig, b"PK\x03\x04");
/// assert_eq!(reader.position(), 4);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct PeekReader<R> {
    inner: R,
    /// Bytes read from `inner` but not yet handed to the caller.
    buf: Vec<u8>,
    /// Read position within `buf`.
    pos: usize,
    /// Total bytes handed to the caller.
    consumed: u64,
}

impl<R: Read> PeekReader<R> {
    /// Creates a new peeking reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
            consumed: 0,
        }
    }

    /// Returns the total number of bytes consumed through this reader.
    ///
    /// Peeked-but-unread bytes do not count.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.consumed
    }

    /// Returns up to `want` bytes from the current position without
    /// consuming them.
    ///
    /// The returned slice is shorter than `want` only when the underlying
    /// stream ends first; in particular it is empty at end of data.
    pub fn peek(&mut self, want: usize) -> std::io::Result<&[u8]> {
        while self.buffered() < want {
            let start = self.buf.len();
            self.buf.resize(start + CHUNK, 0);
            let n = self.inner.read(&mut self.buf[start..])?;
            self.buf.truncate(start + n);
            if n == 0 {
                break;
            }
        }
        let end = (self.pos + want).min(self.buf.len());
        Ok(&self.buf[self.pos..end])
    }

    /// Discards exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::ErrorKind::UnexpectedEof`] if the stream ends
    /// before `n` bytes were skipped.
    pub fn skip(&mut self, n: u64) -> std::io::Result<()> {
        let mut remaining = n;
        let mut scratch = [0u8; CHUNK];
        while remaining > 0 {
            let want = usize::try_from(remaining.min(CHUNK as u64)).unwrap_or(CHUNK);
            let got = self.read(&mut scratch[..want])?;
            if got == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("stream ended {remaining} bytes short of a skip"),
                ));
            }
            remaining -= got as u64;
        }
        Ok(())
    }

    fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Drops the already-consumed prefix of the buffer.
    fn compact(&mut self) {
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
    }
}

// The inner reader is typically a boxed trait object, so Debug skips it.
impl<R> std::fmt::Debug for PeekReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeekReader")
            .field("buffered", &(self.buf.len() - self.pos))
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.buffered() > 0 {
            let n = self.buffered().min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            self.consumed += n as u64;
            self.compact();
            return Ok(n);
        }
        let n = self.inner.read(out)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<R: Read> BufRead for PeekReader<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        if self.buffered() == 0 {
            self.compact();
            self.buf.resize(CHUNK, 0);
            let n = self.inner.read(&mut self.buf)?;
            self.buf.truncate(n);
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        debug_assert!(amt <= self.buffered());
        let amt = amt.min(self.buffered());
        self.pos += amt;
        self.consumed += amt as u64;
        self.compact();
    }
}
