//! Error types for archive reading operations.

use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while opening or iterating an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O operation on the byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression filter nesting exceeded the configured limit.
    ///
    /// Guards against maliciously deep filter chains (e.g. a gzip stream
    /// wrapped in itself hundreds of times). Raised during open, before
    /// any container format detection is attempted.
    #[error("compression filter chain exceeds maximum depth {max}")]
    FilterChainTooDeep {
        /// The configured maximum nesting depth.
        max: usize,
    },

    /// No registered container format matched the input.
    ///
    /// This is the terminal "not an archive (or unsupported)" condition;
    /// an empty buffer also takes this path.
    #[error("unrecognized or unsupported archive format")]
    UnsupportedFormat,

    /// The container format was recognized but uses a feature this reader
    /// does not implement (e.g. a zip compression method other than
    /// stored/deflate, or GNU sparse tar entries).
    #[error("{format}: unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Name of the container format.
        format: &'static str,
        /// Description of the unsupported feature.
        feature: String,
    },

    /// Structurally invalid data inside an otherwise-recognized format.
    #[error("{format}: corrupt archive at offset {offset}: {reason}")]
    Corrupt {
        /// Name of the container format.
        format: &'static str,
        /// Byte offset into the decoded container stream.
        offset: u64,
        /// What failed to parse.
        reason: String,
    },

    /// An entry body is encrypted and no passphrase was supplied at open.
    ///
    /// Recoverable: reopen the archive with a passphrase. Listing entry
    /// metadata may still have succeeded, since headers are often
    /// cleartext even when bodies are not.
    #[error("archive entry is encrypted and no passphrase was supplied")]
    MissingPassphrase,

    /// Decryption failed, typically because the passphrase is wrong.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Why decryption was rejected.
        reason: String,
    },

    /// The session was used after `close()`.
    ///
    /// This is a caller contract violation, not an input problem.
    #[error("archive session used after close")]
    UseAfterClose,
}

impl ArchiveError {
    /// Builds a [`ArchiveError::Corrupt`] with the given context.
    pub(crate) fn corrupt(
        format: &'static str,
        offset: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self::Corrupt {
            format,
            offset,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error can be resolved by reopening the
    /// archive with a (different) passphrase.
    #[must_use]
    pub const fn is_passphrase_error(&self) -> bool {
        matches!(self, Self::MissingPassphrase | Self::Decryption { .. })
    }

    /// Returns `true` if the input data itself is at fault, as opposed to
    /// caller misuse or transport failure.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::FilterChainTooDeep { .. }
                | Self::UnsupportedFormat
                | Self::UnsupportedFeature { .. }
                | Self::Corrupt { .. }
        )
    }

    /// Returns the byte offset associated with this error, if any.
    #[must_use]
    pub const fn offset(&self) -> Option<u64> {
        match self {
            Self::Corrupt { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
