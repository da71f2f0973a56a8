//! Streaming, format-agnostic archive reading engine.
//!
//! `arcread-core` opens an archive from memory or from any byte stream,
//! autodetects its compression filter chain (gzip, bzip2, xz, zstd — also
//! nested) and container format (tar, cpio, zip), and exposes a lazy
//! cursor over entry metadata and bodies. Input is treated as untrusted:
//! every size field is bounded, truncated and malformed structures turn
//! into errors, never panics.
//!
//! # Examples
//!
//! ```no_run
//! use arcread_core::open_archive;
//!
//! # fn main() -> arcread_core::Result<()> {
//! # let data = Vec::new();
//! let mut session = open_archive(data, None)?;
//! while let Some(entry) = session.read_next_entry()? {
//!     println!("{}", entry.name_lossy());
//!     let body = session.read_body_to_end()?;
//!     println!("  {} bytes", body.len());
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod formats;
pub mod io;
pub mod session;
pub mod source;
pub mod types;

// Re-export main API types
pub use api::list_archive;
pub use api::open_archive;
pub use api::version;
pub use config::ReadConfig;
pub use error::ArchiveError;
pub use error::Result;
pub use formats::ContainerFormat;
pub use formats::FilterKind;
pub use session::Session;
pub use session::SessionBuilder;
pub use source::ByteSource;

// Re-export types module for easier access
pub use types::EntryKind;
pub use types::EntryMetadata;
