//! Value types returned to callers.

pub mod entry_kind;
pub mod metadata;

pub use entry_kind::EntryKind;
pub use metadata::EntryMetadata;
