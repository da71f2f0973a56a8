//! Container format readers and the shared reader contract.
//!
//! Each supported format gets one reader variant in [`FormatReader`],
//! selected once per session by [`detect::detect_format`]. Readers parse
//! entry headers from the shared container stream and describe each body
//! as a [`BodyPlan`] locator, which [`body`] turns into a decode cursor.

pub mod body;
pub mod cpio;
pub mod detect;
pub mod filters;
pub mod tar;
pub mod zip;
pub mod zipcrypto;

pub use detect::ContainerFormat;
pub use filters::FilterKind;

pub(crate) use filters::Stream;

use crate::ReadConfig;
use crate::Result;
use crate::types::EntryMetadata;

/// One parsed entry header: the caller-facing record plus the locator
/// for its body.
#[derive(Debug)]
pub(crate) struct ParsedEntry {
    /// Metadata handed to the caller by value.
    pub metadata: EntryMetadata,
    /// Locator consumed by [`body::open_body`]. Only the reader that
    /// produced it knows how to interpret it, and it is invalidated by
    /// the next header read.
    pub plan: BodyPlan,
}

/// Opaque locator describing where and how the current entry's body sits
/// in the container stream.
#[derive(Debug)]
pub(crate) enum BodyPlan {
    /// `size` raw bytes follow immediately, then `padding` bytes of
    /// structural filler to discard. Used by tar and cpio.
    Raw {
        /// Body span length in bytes.
        size: u64,
        /// Alignment filler after the span.
        padding: u64,
    },
    /// A zip member that needs decompression and/or decryption.
    Zip(zip::ZipBodyPlan),
}

impl BodyPlan {
    /// A zero-length body with no trailing filler.
    pub(crate) const EMPTY: Self = Self::Raw {
        size: 0,
        padding: 0,
    };

    /// Whether opening this body requires a passphrase.
    pub(crate) fn needs_passphrase(&self) -> bool {
        matches!(self, Self::Zip(plan) if plan.encrypted)
    }
}

/// Per-format header reader, dispatched as a closed set of variants.
pub(crate) enum FormatReader {
    /// tar block reader.
    Tar(tar::TarReader),
    /// cpio newc/crc reader.
    Cpio(cpio::CpioReader),
    /// zip local-header reader.
    Zip(zip::ZipReader),
}

impl FormatReader {
    /// Creates the reader variant for a detected format.
    pub(crate) fn new(format: ContainerFormat, config: &ReadConfig) -> Self {
        match format {
            ContainerFormat::Tar => Self::Tar(tar::TarReader::new(config)),
            ContainerFormat::Cpio => Self::Cpio(cpio::CpioReader::new(config)),
            ContainerFormat::Zip => Self::Zip(zip::ZipReader::new(config)),
        }
    }

    /// Parses the next entry header, or `None` at the format's logical
    /// end of archive.
    pub(crate) fn next_entry(&mut self, stream: &mut Stream) -> Result<Option<ParsedEntry>> {
        match self {
            Self::Tar(reader) => reader.next_entry(stream),
            Self::Cpio(reader) => reader.next_entry(stream),
            Self::Zip(reader) => reader.next_entry(stream),
        }
    }
}
