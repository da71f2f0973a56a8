//! Container format detection.
//!
//! Runs on the innermost decoded stream, after the filter chain has been
//! resolved. Formats are a closed set of tagged variants matched by an
//! ordered signature table, most specific signature first; there is no
//! open-ended registry.

use crate::ArchiveError;
use crate::Result;
use crate::formats::filters::Stream;
use crate::formats::tar;

/// Tar magic lives at offset 257 of the first header block; magic-less
/// v7 tar needs the whole first block for its checksum, so that is the
/// window detection peeks.
const DETECT_WINDOW: usize = tar::BLOCK_SIZE;

/// End of the `ustar` magic field within the first header block.
const USTAR_MAGIC_END: usize = 262;

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// ZIP local-file-header stream.
    Zip,
    /// cpio, newc (`070701`) or crc (`070702`) variant.
    Cpio,
    /// tar: ustar/POSIX, PAX, or pre-POSIX with a valid header checksum.
    Tar,
}

impl ContainerFormat {
    /// Returns a human-readable name for this format.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Cpio => "cpio",
            Self::Tar => "tar",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the container format by peeking the stream's header bytes.
///
/// Runs at most once per session, before any entry is read.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsupportedFormat`] when no registered format
/// matches; an empty stream takes this path too.
pub(crate) fn detect_format(stream: &mut Stream) -> Result<ContainerFormat> {
    let magic = stream.peek(DETECT_WINDOW)?;

    // ZIP: local file header, or end-of-central-directory for an archive
    // with zero entries.
    if magic.starts_with(b"PK\x03\x04") || magic.starts_with(b"PK\x05\x06") {
        return Ok(ContainerFormat::Zip);
    }

    // cpio newc/crc: six ASCII magic chars.
    if magic.starts_with(b"070701") || magic.starts_with(b"070702") {
        return Ok(ContainerFormat::Cpio);
    }

    // tar: "ustar" at offset 257 covers POSIX and GNU ("ustar\0" and
    // "ustar "). Pre-POSIX v7 tar has no magic at all, so fall back to
    // validating the header checksum of a full first block.
    if magic.len() >= USTAR_MAGIC_END && &magic[257..262] == b"ustar" {
        return Ok(ContainerFormat::Tar);
    }
    if magic.len() >= tar::BLOCK_SIZE && tar::checksum_valid(&magic[..tar::BLOCK_SIZE]) {
        return Ok(ContainerFormat::Tar);
    }

    Err(ArchiveError::UnsupportedFormat)
}
