//! The archive session: a stateful cursor over one opened archive.
//!
//! A [`Session`] owns the byte source, the resolved filter chain, and the
//! format reader, and exposes the read-next-entry / read-body contract.
//! Detection runs exactly once, at open; a detection failure produces no
//! session at all.

use std::fmt;

use crate::ArchiveError;
use crate::ReadConfig;
use crate::Result;
use crate::formats::BodyPlan;
use crate::formats::ContainerFormat;
use crate::formats::FilterKind;
use crate::formats::FormatReader;
use crate::formats::Stream;
use crate::formats::body;
use crate::formats::body::Body;
use crate::formats::detect::detect_format;
use crate::formats::filters::resolve_chain;
use crate::source::ByteSource;
use crate::types::EntryMetadata;

/// Cursor position within the entry sequence.
enum State {
    /// Detection done, no entry selected yet.
    Ready,
    /// An entry header has been returned. `plan` is `Some` until the
    /// body is opened or discarded.
    Selected { plan: Option<BodyPlan> },
    /// The current entry's body is open and partially delivered.
    Reading(Body),
    /// Logical end of archive, or iteration aborted by a per-entry
    /// error. Terminal for reading, but `close` still applies.
    Exhausted,
    /// Closed by the caller. Terminal.
    Closed,
}

impl State {
    const fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Selected { .. } => "entry-selected",
            Self::Reading(_) => "reading-body",
            Self::Exhausted => "exhausted",
            Self::Closed => "closed",
        }
    }
}

/// Builder for [`Session`] with non-default settings.
///
/// # Examples
///
/// ```no_run
/// use arcread_core::{ByteSource, ReadConfig, Session};
///
/// # fn demo(data: Vec<u8>) -> arcread_core::Result<()> {
/// let session = Session::builder()
///     .config(ReadConfig::permissive())
///     .passphrase("hunter2")
///     .open(ByteSource::from_bytes(data))?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<ReadConfig>,
    passphrase: Option<Vec<u8>>,
}

impl SessionBuilder {
    /// Creates a new `SessionBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read configuration.
    #[must_use]
    pub fn config(mut self, config: ReadConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the passphrase used to decrypt encrypted entry bodies.
    #[must_use]
    pub fn passphrase(mut self, passphrase: impl Into<Vec<u8>>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Opens `source`, running filter-chain and container-format
    /// detection.
    ///
    /// # Errors
    ///
    /// Fails with [`ArchiveError::FilterChainTooDeep`] when compression
    /// nesting exceeds the configured limit, and with
    /// [`ArchiveError::UnsupportedFormat`] when no container format
    /// matches (an empty source included). Detection failures produce no
    /// partial session.
    pub fn open(self, source: ByteSource) -> Result<Session> {
        let config = self.config.unwrap_or_default();
        let (mut stream, filters) = resolve_chain(source, &config)?;
        let format = detect_format(&mut stream)?;
        let reader = FormatReader::new(format, &config);
        Ok(Session {
            stream: Some(stream),
            reader,
            format,
            filters,
            passphrase: self.passphrase,
            entry_offset: 0,
            state: State::Ready,
        })
    }
}

/// A stateful cursor over one opened archive.
///
/// Exactly one live session per opened archive; a session is a
/// sequential cursor and is not meant to be shared across threads.
/// Separate sessions over separate sources are independent.
///
/// # Examples
///
/// ```no_run
/// use arcread_core::{ByteSource, Session};
///
/// # fn demo(data: Vec<u8>) -> arcread_core::Result<()> {
/// let mut session = Session::open(ByteSource::from_bytes(data))?;
/// while let Some(entry) = session.read_next_entry()? {
///     println!("{} ({:?} bytes)", entry.name_lossy(), entry.size);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    /// `None` while a [`Body`] holds the stream, and after close.
    stream: Option<Stream>,
    reader: FormatReader,
    format: ContainerFormat,
    filters: Vec<FilterKind>,
    passphrase: Option<Vec<u8>>,
    /// Decoded-stream offset of the current entry's header, reported as
    /// error context for body failures.
    entry_offset: u64,
    state: State,
}

impl Session {
    /// Opens `source` with default settings and no passphrase.
    ///
    /// # Errors
    ///
    /// See [`SessionBuilder::open`].
    pub fn open(source: ByteSource) -> Result<Self> {
        Self::builder().open(source)
    }

    /// Returns a builder for a session with custom settings.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The detected container format.
    #[must_use]
    pub const fn format(&self) -> ContainerFormat {
        self.format
    }

    /// The detected compression filter chain, outermost first. Empty for
    /// an uncompressed source.
    #[must_use]
    pub fn filters(&self) -> &[FilterKind] {
        &self.filters
    }

    /// Advances to the next entry and returns its metadata, or `None` at
    /// the end of the archive.
    ///
    /// Any unread bytes of the previous entry's body are discarded.
    /// Returned records are plain values; they stay valid after the
    /// session advances or closes.
    ///
    /// # Errors
    ///
    /// Fails with [`ArchiveError::UseAfterClose`] on a closed session and
    /// with [`ArchiveError::Corrupt`] / [`ArchiveError::UnsupportedFeature`]
    /// on a bad entry header. A per-entry failure ends iteration at that
    /// entry; later calls return `Ok(None)`.
    pub fn read_next_entry(&mut self) -> Result<Option<EntryMetadata>> {
        // Errors below leave the session exhausted: iteration aborts at
        // the failing entry, already-returned records stay valid.
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Closed => {
                self.state = State::Closed;
                return Err(ArchiveError::UseAfterClose);
            }
            State::Exhausted => return Ok(None),
            State::Reading(body) => {
                let stream = body.finish().map_err(|err| self.body_error(err))?;
                self.stream = Some(stream);
            }
            State::Selected { plan: Some(plan) } => self.discard_plan(plan)?,
            State::Ready | State::Selected { plan: None } => {}
        }

        let stream = self.stream.as_mut().ok_or(ArchiveError::UseAfterClose)?;
        self.entry_offset = stream.position();
        match self.reader.next_entry(stream)? {
            Some(entry) => {
                self.state = State::Selected {
                    plan: Some(entry.plan),
                };
                Ok(Some(entry.metadata))
            }
            None => Ok(None),
        }
    }

    /// Reads the next chunk of the current entry's decoded body into
    /// `out`, returning the number of bytes written. `Ok(0)` means end of
    /// body (or no entry selected / a bodiless entry).
    ///
    /// Bodies are delivered incrementally; reading past the end returns
    /// `Ok(0)` rather than an error.
    ///
    /// # Errors
    ///
    /// Fails with [`ArchiveError::MissingPassphrase`] on the first body
    /// read of an encrypted entry when no passphrase was supplied — the
    /// entry itself stays selected, and metadata iteration may continue.
    /// Fails with [`ArchiveError::Decryption`] for a wrong passphrase and
    /// [`ArchiveError::Corrupt`] for undecodable body data; those abort
    /// iteration. [`ArchiveError::UseAfterClose`] after close.
    pub fn read_body(&mut self, out: &mut [u8]) -> Result<usize> {
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Closed => {
                self.state = State::Closed;
                Err(ArchiveError::UseAfterClose)
            }
            State::Ready => {
                self.state = State::Ready;
                Ok(0)
            }
            State::Exhausted => Ok(0),
            State::Selected { plan: None } => {
                self.state = State::Selected { plan: None };
                Ok(0)
            }
            State::Selected { plan: Some(plan) } => {
                if plan.needs_passphrase() && self.passphrase.is_none() {
                    self.state = State::Selected { plan: Some(plan) };
                    return Err(ArchiveError::MissingPassphrase);
                }
                let stream = self.stream.take().ok_or(ArchiveError::UseAfterClose)?;
                let mut body = body::open_body(plan, stream, self.passphrase.as_deref())?;
                let n = body.read(out).map_err(|err| self.body_error(err))?;
                self.state = State::Reading(body);
                Ok(n)
            }
            State::Reading(mut body) => {
                let n = body.read(out).map_err(|err| self.body_error(err))?;
                self.state = State::Reading(body);
                Ok(n)
            }
        }
    }

    /// Reads the rest of the current entry's body into a vector.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`read_body`](Self::read_body).
    pub fn read_body_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 8 * 1024];
        loop {
            let n = self.read_body(&mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    /// Closes the session, releasing the byte source and all decode
    /// state and wiping the passphrase.
    ///
    /// Idempotent: closing an already-closed session is a no-op. Every
    /// *other* operation on a closed session fails with
    /// [`ArchiveError::UseAfterClose`].
    pub fn close(&mut self) {
        self.wipe_passphrase();
        self.stream = None;
        self.state = State::Closed;
    }

    /// Skips an unopened body without running the decode pipeline where
    /// the span length is known. Encrypted spans are skipped as raw
    /// bytes, which is what lets a passphrase-less session still list
    /// every entry.
    fn discard_plan(&mut self, plan: BodyPlan) -> Result<()> {
        match plan {
            BodyPlan::Raw { size, padding } => {
                let stream = self.stream.as_mut().ok_or(ArchiveError::UseAfterClose)?;
                let skipped = stream.skip(size + padding);
                skipped.map_err(|err| self.body_error(err))
            }
            BodyPlan::Zip(zip_plan) => match zip_plan.compressed_size {
                Some(span) => {
                    let stream = self.stream.as_mut().ok_or(ArchiveError::UseAfterClose)?;
                    let skipped = stream.skip(span);
                    skipped.map_err(|err| self.body_error(err))
                }
                // Unknown span length: only the decoder knows where the
                // body ends, so decode and discard. Such members are
                // never encrypted (rejected at header parse).
                None => {
                    let stream = self.stream.take().ok_or(ArchiveError::UseAfterClose)?;
                    let body = body::open_body(BodyPlan::Zip(zip_plan), stream, None)?;
                    let stream = body.finish().map_err(|err| self.body_error(err))?;
                    self.stream = Some(stream);
                    Ok(())
                }
            },
        }
    }

    /// Maps a body-stage I/O failure to the error taxonomy: undecodable
    /// or short data is a corruption of the current entry, anything else
    /// is transport.
    fn body_error(&self, err: std::io::Error) -> ArchiveError {
        match err.kind() {
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                ArchiveError::corrupt(self.format.name(), self.entry_offset, err.to_string())
            }
            _ => ArchiveError::Io(err),
        }
    }

    fn wipe_passphrase(&mut self) {
        if let Some(passphrase) = self.passphrase.as_mut() {
            passphrase.fill(0);
        }
        self.passphrase = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.wipe_passphrase();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("format", &self.format)
            .field("filters", &self.filters)
            .field("state", &self.state.name())
            .field("has_passphrase", &self.passphrase.is_some())
            .finish_non_exhaustive()
    }
}
