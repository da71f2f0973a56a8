//! Compression filter detection and decoding.
//!
//! A filter is a compression layer wrapped around the container bytes
//! (e.g. the gzip in `.tar.gz`). Filters nest: detection repeatedly
//! matches magic bytes, wraps the stream in the matching codec's decoder,
//! and re-inspects the now-inner bytes until no filter matches or the
//! configured depth limit trips.

use std::io::Read;

use crate::ArchiveError;
use crate::ReadConfig;
use crate::Result;
use crate::io::PeekReader;
use crate::source::ByteSource;

/// The decoded container stream every format reader parses.
pub(crate) type Stream = PeekReader<Box<dyn Read>>;

/// Peek window large enough for the longest filter signature.
const MAGIC_WINDOW: usize = 6;

/// Compression filter applied over the container bytes.
///
/// One tag per supported codec, matched by an ordered signature table
/// (most specific signature first). Decompression itself is delegated to
/// the codec crates; this enum only identifies and wires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Gzip (deflate) stream, `1F 8B 08`.
    Gzip,
    /// Bzip2 stream, `BZh` followed by a level digit.
    Bzip2,
    /// XZ (LZMA2) stream, `FD 37 7A 58 5A 00`.
    Xz,
    /// Zstandard frame, `28 B5 2F FD`.
    Zstd,
}

impl FilterKind {
    /// Matches the filter signature table against peeked header bytes.
    ///
    /// Longest signatures are tried first so a more specific magic can
    /// never be shadowed by a shorter one.
    #[must_use]
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.len() >= 6 && magic.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
            return Some(Self::Xz);
        }
        if magic.len() >= 4 && magic.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            return Some(Self::Zstd);
        }
        if magic.len() >= 4 && magic.starts_with(b"BZh") && magic[3].is_ascii_digit() {
            return Some(Self::Bzip2);
        }
        // Third byte is the compression method: 8 = deflate, the only
        // method gzip ever standardized.
        if magic.len() >= 3 && magic.starts_with(&[0x1F, 0x8B, 0x08]) {
            return Some(Self::Gzip);
        }
        None
    }

    /// Returns a human-readable name for this filter.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Wraps `inner` in this filter's streaming decoder.
    fn decoder(self, inner: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::GzDecoder::new(inner)),
            Self::Bzip2 => Box::new(bzip2::read::BzDecoder::new(inner)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new(inner)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(inner)?),
        })
    }
}

/// Resolves the filter chain of `source`, returning the fully decoded
/// container stream and the chain outermost-first.
///
/// Detecting zero filters is valid and common (a bare tar or zip).
///
/// # Errors
///
/// Returns [`ArchiveError::FilterChainTooDeep`] when more than
/// `config.max_filter_depth` nested filters match, before any container
/// format detection is attempted.
pub(crate) fn resolve_chain(
    source: ByteSource,
    config: &ReadConfig,
) -> Result<(Stream, Vec<FilterKind>)> {
    let mut stream: Stream = PeekReader::new(source.into_reader());
    let mut chain = Vec::new();

    loop {
        let kind = FilterKind::from_magic(stream.peek(MAGIC_WINDOW)?);
        let Some(kind) = kind else {
            return Ok((stream, chain));
        };
        if chain.len() >= config.max_filter_depth {
            return Err(ArchiveError::FilterChainTooDeep {
                max: config.max_filter_depth,
            });
        }
        chain.push(kind);
        stream = PeekReader::new(kind.decoder(Box::new(stream))?);
    }
}
