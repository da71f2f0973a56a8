//! Byte source abstraction over memory buffers and pull streams.

use std::io::Cursor;
use std::io::Read;

/// Input to an archive session: either a whole buffer held in memory or
/// an incremental pull stream.
///
/// The rest of the engine only ever consumes a `ByteSource` through
/// [`Read`], so the two variants behave identically downstream. A read
/// returning 0 signals end of data; transport failures surface as
/// `std::io::Error` and are mapped to [`crate::ArchiveError::Io`].
///
/// # Examples
///
/// ```
/// use arcread_core::ByteSource;
///
/// let from_memory = ByteSource::from_bytes(vec![0x1f, 0x8b]);
/// let from_stream = ByteSource::from_reader(std::io::empty());
/// ```
pub enum ByteSource {
    /// Whole buffer available up front.
    Memory(Cursor<Vec<u8>>),
    /// Incremental pull stream.
    Stream(Box<dyn Read>),
}

impl ByteSource {
    /// Creates a source backed by an in-memory buffer.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::Memory(Cursor::new(data))
    }

    /// Creates a source backed by a pull stream.
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Returns the total length when known (memory-backed only).
    #[must_use]
    pub fn len_hint(&self) -> Option<u64> {
        match self {
            Self::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            Self::Stream(_) => None,
        }
    }

    /// Consumes the source, yielding a plain reader.
    #[must_use]
    pub(crate) fn into_reader(self) -> Box<dyn Read> {
        match self {
            Self::Memory(cursor) => Box::new(cursor),
            Self::Stream(reader) => reader,
        }
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory(cursor) => f
                .debug_struct("ByteSource::Memory")
                .field("len", &cursor.get_ref().len())
                .finish(),
            Self::Stream(_) => f.debug_struct("ByteSource::Stream").finish_non_exhaustive(),
        }
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::Stream(reader) => reader.read(buf),
        }
    }
}
