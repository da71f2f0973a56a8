//! zip format reader (forward-only local-header walk).
//!
//! Parses local file headers in stream order without seeking to the
//! central directory, which keeps the reader usable on non-seekable
//! decoded streams. The trade-off: metadata that only lives in the
//! central directory (Unix mode bits, symlink markers) is unavailable,
//! and iteration ends at the first central-directory signature.

use std::io::Read;

use crate::ArchiveError;
use crate::ReadConfig;
use crate::Result;
use crate::formats::BodyPlan;
use crate::formats::ParsedEntry;
use crate::formats::Stream;
use crate::types::EntryKind;
use crate::types::EntryMetadata;

const FORMAT: &str = "zip";

/// Local file header signature.
const LOCAL_SIG: [u8; 4] = [b'P', b'K', 0x03, 0x04];
/// Central directory file header signature: end of entry stream.
const CENTRAL_SIG: [u8; 4] = [b'P', b'K', 0x01, 0x02];
/// End-of-central-directory signature: end of a zero-entry archive.
const EOCD_SIG: [u8; 4] = [b'P', b'K', 0x05, 0x06];
/// Optional data descriptor signature.
const DESCRIPTOR_SIG: [u8; 4] = [b'P', b'K', 0x07, 0x08];

/// General purpose flag: member is encrypted.
const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: sizes live in a trailing data descriptor.
const FLAG_DESCRIPTOR: u16 = 0x0008;

/// Compression method of a zip member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ZipMethod {
    /// Method 0: no compression.
    Stored,
    /// Method 8: raw deflate.
    Deflate,
}

/// Locator for a zip member body that needs decoding and/or decryption.
#[derive(Debug)]
pub(crate) struct ZipBodyPlan {
    pub method: ZipMethod,
    /// Compressed span length; `None` when a data descriptor follows.
    pub compressed_size: Option<u64>,
    /// Declared uncompressed size; `None` when a data descriptor follows.
    pub declared_size: Option<u64>,
    pub encrypted: bool,
    /// High byte of the member's CRC-32, for passphrase verification.
    pub check_byte: u8,
}

/// Streaming zip local-header reader.
pub(crate) struct ZipReader {
    max_name_len: usize,
    max_meta_len: usize,
    finished: bool,
}

impl ZipReader {
    pub(crate) fn new(config: &ReadConfig) -> Self {
        Self {
            max_name_len: config.max_name_len,
            max_meta_len: config.max_meta_len,
            finished: false,
        }
    }

    pub(crate) fn next_entry(&mut self, stream: &mut Stream) -> Result<Option<ParsedEntry>> {
        if self.finished {
            return Ok(None);
        }

        let header_offset = stream.position();
        let mut sig = [0u8; 4];
        stream.read_exact(&mut sig).map_err(|_| {
            // A zip must end with its central directory; bare EOF here
            // means the archive was cut short.
            ArchiveError::corrupt(FORMAT, header_offset, "truncated before central directory")
        })?;

        if sig == CENTRAL_SIG || sig == EOCD_SIG {
            self.finished = true;
            return Ok(None);
        }
        if sig != LOCAL_SIG {
            return Err(ArchiveError::corrupt(
                FORMAT,
                header_offset,
                "bad local file header signature",
            ));
        }

        let mut fixed = [0u8; 26];
        stream.read_exact(&mut fixed).map_err(|_| {
            ArchiveError::corrupt(FORMAT, header_offset, "truncated local file header")
        })?;

        let flags = le_u16(&fixed[2..4]);
        let method = le_u16(&fixed[4..6]);
        let dos_time = le_u16(&fixed[6..8]);
        let dos_date = le_u16(&fixed[8..10]);
        let crc32 = le_u32(&fixed[10..14]);
        let compressed_size = u64::from(le_u32(&fixed[14..18]));
        let declared_size = u64::from(le_u32(&fixed[18..22]));
        let name_len = usize::from(le_u16(&fixed[22..24]));
        let extra_len = u64::from(le_u16(&fixed[24..26]));

        if name_len == 0 || name_len > self.max_name_len {
            return Err(ArchiveError::corrupt(
                FORMAT,
                header_offset,
                format!("entry name of {name_len} bytes out of range"),
            ));
        }
        if extra_len > self.max_meta_len as u64 {
            return Err(ArchiveError::corrupt(
                FORMAT,
                header_offset,
                "extra field exceeds metadata limit",
            ));
        }

        let mut name = vec![0u8; name_len];
        stream.read_exact(&mut name).map_err(|_| {
            ArchiveError::corrupt(FORMAT, header_offset, "truncated entry name")
        })?;
        stream.skip(extra_len).map_err(|_| {
            ArchiveError::corrupt(FORMAT, header_offset, "truncated extra field")
        })?;

        if compressed_size == u64::from(u32::MAX) || declared_size == u64::from(u32::MAX) {
            return Err(ArchiveError::UnsupportedFeature {
                format: FORMAT,
                feature: "zip64 member sizes".into(),
            });
        }

        let method = match method {
            0 => ZipMethod::Stored,
            8 => ZipMethod::Deflate,
            99 => {
                return Err(ArchiveError::UnsupportedFeature {
                    format: FORMAT,
                    feature: "AES encryption".into(),
                });
            }
            other => {
                return Err(ArchiveError::UnsupportedFeature {
                    format: FORMAT,
                    feature: format!("compression method {other}"),
                });
            }
        };

        let encrypted = flags & FLAG_ENCRYPTED != 0;
        let descriptor = flags & FLAG_DESCRIPTOR != 0;
        if descriptor && encrypted {
            return Err(ArchiveError::UnsupportedFeature {
                format: FORMAT,
                feature: "encrypted member with data descriptor".into(),
            });
        }
        if descriptor && method == ZipMethod::Stored {
            // Nothing delimits a stored span of unknown length.
            return Err(ArchiveError::corrupt(
                FORMAT,
                header_offset,
                "stored member with data descriptor is not delimitable",
            ));
        }

        let kind = if name.last() == Some(&b'/') {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let is_directory = kind.is_directory();

        let metadata = EntryMetadata {
            name,
            size: if is_directory {
                Some(0)
            } else if descriptor {
                None
            } else {
                Some(declared_size)
            },
            kind,
            // Mode bits live in the central directory only.
            mode: None,
            mtime: dos_to_unix(dos_date, dos_time),
        };

        // Stored members go through the zip plan too: the declared
        // uncompressed size caps delivery even when the header claims a
        // larger compressed span.
        let plan = BodyPlan::Zip(ZipBodyPlan {
            method,
            compressed_size: if descriptor { None } else { Some(compressed_size) },
            declared_size: if descriptor { None } else { Some(declared_size) },
            encrypted,
            check_byte: (crc32 >> 24) as u8,
        });

        Ok(Some(ParsedEntry { metadata, plan }))
    }
}

/// Consumes a trailing data descriptor, with or without its optional
/// signature.
pub(crate) fn consume_data_descriptor(stream: &mut Stream) -> std::io::Result<()> {
    let has_sig = stream.peek(4)?.starts_with(&DESCRIPTOR_SIG);
    // crc32 + compressed size + uncompressed size, each 4 bytes.
    stream.skip(if has_sig { 16 } else { 12 })
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Converts MS-DOS date/time fields to Unix seconds.
///
/// Returns `None` for the all-zero placeholder and for fields that do
/// not name a real calendar date.
fn dos_to_unix(date: u16, time: u16) -> Option<u64> {
    if date == 0 {
        return None;
    }
    let year = i64::from(date >> 9) + 1980;
    let month = i64::from((date >> 5) & 0x0F);
    let day = i64::from(date & 0x1F);
    let hour = i64::from(time >> 11);
    let minute = i64::from((time >> 5) & 0x3F);
    let second = i64::from(time & 0x1F) * 2;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
        return None;
    }

    // Days-from-civil (Howard Hinnant's algorithm), valid for the whole
    // DOS date range.
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;

    u64::try_from(days * 86_400 + hour * 3600 + minute * 60 + second).ok()
}
