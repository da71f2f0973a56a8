//! Archive entry kind enumeration.

/// Kind of entry in an archive.
///
/// Link variants carry their target path as raw bytes, exactly as stored
/// in the archive: targets are attacker-controlled and not necessarily
/// valid UTF-8, let alone safe paths.
///
/// # Examples
///
/// ```
/// use arcread_core::EntryKind;
///
/// let file = EntryKind::File;
/// let link = EntryKind::Symlink {
///     target: b"../target".to_vec(),
/// };
/// assert!(link.is_link());
/// assert!(!file.is_link());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,

    /// Directory. Zero-length body.
    Directory,

    /// Symbolic link. Zero-length body; the target is metadata.
    Symlink {
        /// Raw link target bytes (not validated).
        target: Vec<u8>,
    },

    /// Hard link to an earlier entry. Zero-length body.
    Hardlink {
        /// Raw link target bytes (not validated).
        target: Vec<u8>,
    },

    /// FIFO / named pipe.
    Fifo,

    /// Character device node.
    CharDevice,

    /// Block device node.
    BlockDevice,
}

impl EntryKind {
    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if this is a symlink or hardlink.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Self::Symlink { .. } | Self::Hardlink { .. })
    }

    /// Returns the link target for symlink and hardlink entries.
    #[must_use]
    pub fn link_target(&self) -> Option<&[u8]> {
        match self {
            Self::Symlink { target } | Self::Hardlink { target } => Some(target),
            _ => None,
        }
    }

    /// Returns `true` if entries of this kind never carry a body.
    #[must_use]
    pub const fn is_bodiless(&self) -> bool {
        !matches!(self, Self::File)
    }
}
