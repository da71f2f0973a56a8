//! Convenience entry points over [`Session`].

use crate::ReadConfig;
use crate::Result;
use crate::session::Session;
use crate::source::ByteSource;
use crate::types::EntryMetadata;

/// Returns the engine's identification string, for diagnostics.
#[must_use]
pub fn version() -> &'static str {
    concat!("arcread ", env!("CARGO_PKG_VERSION"))
}

/// Opens an in-memory archive with default settings.
///
/// `passphrase` is used to decrypt encrypted entry bodies; pass `None`
/// for unencrypted archives (listing an encrypted archive's entries
/// usually works without one).
///
/// # Errors
///
/// Fails when the buffer is not a recognized archive; see
/// [`SessionBuilder::open`](crate::SessionBuilder::open).
pub fn open_archive(data: Vec<u8>, passphrase: Option<&str>) -> Result<Session> {
    let builder = Session::builder();
    let builder = match passphrase {
        Some(passphrase) => builder.passphrase(passphrase),
        None => builder,
    };
    builder.open(ByteSource::from_bytes(data))
}

/// Lists every entry of an in-memory archive without decoding any bodies.
///
/// # Errors
///
/// Fails on detection failure or a corrupt entry header; metadata
/// returned before the failing header is lost — use a [`Session`]
/// directly to keep partial results.
pub fn list_archive(data: Vec<u8>, config: &ReadConfig) -> Result<Vec<EntryMetadata>> {
    let mut session = Session::builder()
        .config(config.clone())
        .open(ByteSource::from_bytes(data))?;
    let mut entries = Vec::new();
    while let Some(entry) = session.read_next_entry()? {
        entries.push(entry);
    }
    Ok(entries)
}
