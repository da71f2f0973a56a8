//! Byte-limited `BufRead` adaptor.

use std::io::BufRead;
use std::io::Read;

/// `BufRead` wrapper that exposes at most `limit` bytes of the inner
/// reader, or all of it when the limit is unknown.
///
/// This delimits an entry's compressed span inside the container stream:
/// decoders layered on top can buffer and read ahead freely without ever
/// touching bytes that belong to the next entry header. Unlike
/// [`std::io::Take`] the limit is optional, which lets the zip reader use
/// one code path for entries with and without a known compressed size.
pub struct BoundedBufRead<R> {
    inner: R,
    /// Remaining bytes, or `None` for no bound.
    remaining: Option<u64>,
}

impl<R: BufRead> BoundedBufRead<R> {
    /// Creates a bounded reader exposing `limit` bytes of `inner`, or the
    /// whole of it when `limit` is `None`.
    pub fn new(inner: R, limit: Option<u64>) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    /// Returns the remaining byte budget, if bounded.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Consumes the wrapper, returning the inner reader.
    ///
    /// Any un-read budget is left in place; callers that need the inner
    /// reader positioned at the end of the span should [`drain`] first.
    ///
    /// [`drain`]: Self::drain
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads and discards the rest of the bounded span.
    ///
    /// Does nothing when the reader is unbounded: without a limit there
    /// is no span end to advance to.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::ErrorKind::UnexpectedEof`] if the inner reader
    /// ends before the span does.
    pub fn drain(&mut self) -> std::io::Result<()> {
        while self.remaining.is_some_and(|remaining| remaining > 0) {
            let n = self.fill_buf()?.len();
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream ended inside a bounded span",
                ));
            }
            self.consume(n);
        }
        Ok(())
    }
}

impl<R: BufRead> Read for BoundedBufRead<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for BoundedBufRead<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        let cap = match self.remaining {
            Some(0) => return Ok(&[]),
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => usize::MAX,
        };
        let buf = self.inner.fill_buf()?;
        let n = buf.len().min(cap);
        Ok(&buf[..n])
    }

    fn consume(&mut self, amt: usize) {
        if let Some(remaining) = self.remaining.as_mut() {
            debug_assert!(amt as u64 <= *remaining);
            *remaining = remaining.saturating_sub(amt as u64);
        }
        self.inner.consume(amt);
    }
}
