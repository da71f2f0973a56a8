//! Entry metadata records.

use std::borrow::Cow;

use crate::types::EntryKind;

/// Immutable description of one archived item.
///
/// Produced fresh by each successful `read_next_entry` call and handed to
/// the caller by value: it carries no references into session state and
/// stays valid after the session advances or closes. It does *not* keep
/// the entry's body readable — the body belongs to the session cursor and
/// is invalidated by the next advance.
///
/// # Examples
///
/// ```
/// use arcread_core::{EntryKind, EntryMetadata};
///
/// let meta = EntryMetadata {
///     name: b"docs/readme.txt".to_vec(),
///     size: Some(1204),
///     kind: EntryKind::File,
///     mode: Some(0o644),
///     mtime: Some(1_700_000_000),
/// };
/// assert_eq!(meta.name_lossy(), "docs/readme.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Entry path, byte-accurate as stored in the archive. Not
    /// necessarily valid UTF-8 and not validated against traversal.
    pub name: Vec<u8>,

    /// Uncompressed body size in bytes. `None` when the format only
    /// reveals the size after the body has been streamed (zip entries
    /// with data descriptors).
    pub size: Option<u64>,

    /// Entry kind.
    pub kind: EntryKind,

    /// Unix permission bits, when the format records them.
    pub mode: Option<u32>,

    /// Modification time as Unix seconds, when recorded.
    pub mtime: Option<u64>,
}

impl EntryMetadata {
    /// Returns the entry name as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Returns `true` for entries whose name ends with `/`.
    ///
    /// Some zip writers mark directories only this way, without a
    /// distinct kind.
    #[must_use]
    pub fn has_directory_name(&self) -> bool {
        self.name.last() == Some(&b'/')
    }
}
