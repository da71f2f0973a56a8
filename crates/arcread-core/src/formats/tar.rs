//! tar format reader.
//!
//! Handles ustar/POSIX headers, PAX extended headers (`x`/`g`), GNU long
//! name/link records (`L`/`K`), and pre-POSIX v7 headers identified by
//! checksum. All fields are parsed defensively: this is untrusted input.

use std::collections::HashMap;
use std::io::Read;

use crate::ArchiveError;
use crate::ReadConfig;
use crate::Result;
use crate::formats::BodyPlan;
use crate::formats::ParsedEntry;
use crate::formats::Stream;
use crate::types::EntryKind;
use crate::types::EntryMetadata;

/// tar block size; headers and body padding are all block-aligned.
pub(crate) const BLOCK_SIZE: usize = 512;

const FORMAT: &str = "tar";

/// Validates the header checksum of a 512-byte block.
///
/// The checksum field itself is summed as if it contained spaces. Used
/// both for header verification and for magic-less v7 tar detection.
pub(crate) fn checksum_valid(block: &[u8]) -> bool {
    debug_assert_eq!(block.len(), BLOCK_SIZE);
    let Ok(stored) = parse_octal(&block[148..156]) else {
        return false;
    };
    if stored == 0 {
        return false;
    }
    let mut sum: u64 = 0;
    for (i, &byte) in block.iter().enumerate() {
        sum += if (148..156).contains(&i) {
            u64::from(b' ')
        } else {
            u64::from(byte)
        };
    }
    sum == stored
}

/// Parses a NUL/space-terminated octal field.
fn parse_octal(field: &[u8]) -> std::result::Result<u64, ()> {
    // GNU base-256 extension for values that overflow octal.
    if let Some(&first) = field.first()
        && first & 0x80 != 0
    {
        let mut value: u64 = u64::from(first & 0x7F);
        for &byte in &field[1..] {
            value = value.checked_mul(256).ok_or(())?;
            value += u64::from(byte);
        }
        return Ok(value);
    }

    let mut value: u64 = 0;
    let mut seen_digit = false;
    for &byte in field {
        match byte {
            b'0'..=b'7' => {
                value = value.checked_mul(8).ok_or(())?;
                value += u64::from(byte - b'0');
                seen_digit = true;
            }
            b' ' if !seen_digit => {} // leading padding
            b' ' | 0 => break,        // terminator
            _ => return Err(()),
        }
    }
    Ok(value)
}

/// Returns the field up to its NUL terminator, byte-accurate.
fn trim_field(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Padding needed to round `size` up to the next block boundary.
fn block_padding(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64 - size
}

/// Overrides carried from PAX / GNU long-name records to the entry they
/// apply to.
#[derive(Default)]
struct PendingOverrides {
    name: Option<Vec<u8>>,
    link_target: Option<Vec<u8>>,
    size: Option<u64>,
    mtime: Option<u64>,
}

/// Streaming tar header reader.
pub(crate) struct TarReader {
    max_name_len: usize,
    max_meta_len: usize,
    /// PAX `g` records apply to every subsequent entry.
    global: HashMap<String, String>,
    /// PAX `x` / GNU `L`/`K` records apply to the next entry only.
    pending: PendingOverrides,
    done: bool,
}

impl TarReader {
    pub(crate) fn new(config: &ReadConfig) -> Self {
        Self {
            max_name_len: config.max_name_len,
            max_meta_len: config.max_meta_len,
            global: HashMap::new(),
            pending: PendingOverrides::default(),
            done: false,
        }
    }

    pub(crate) fn next_entry(&mut self, stream: &mut Stream) -> Result<Option<ParsedEntry>> {
        if self.done {
            return Ok(None);
        }
        loop {
            let header_offset = stream.position();
            let Some(block) = read_block(stream, header_offset)? else {
                // EOF at a block boundary with no zero marker: GNU tar
                // accepts this as a clean end, so do we.
                self.done = true;
                return Ok(None);
            };

            if block.iter().all(|&b| b == 0) {
                self.done = true;
                return Ok(None);
            }

            if !checksum_valid(&block) {
                return Err(ArchiveError::corrupt(
                    FORMAT,
                    header_offset,
                    "header checksum mismatch",
                ));
            }

            let size = parse_octal(&block[124..136]).map_err(|()| {
                ArchiveError::corrupt(FORMAT, header_offset, "invalid size field")
            })?;
            let typeflag = block[156];

            match typeflag {
                b'x' | b'g' => {
                    let data = self.read_meta(stream, size, header_offset)?;
                    let records = parse_pax_records(&data);
                    if typeflag == b'g' {
                        self.global.extend(records);
                    } else {
                        self.apply_pax(&records, header_offset)?;
                    }
                }
                b'L' => {
                    let data = self.read_meta(stream, size, header_offset)?;
                    self.pending.name = Some(trim_field(&data).to_vec());
                }
                b'K' => {
                    let data = self.read_meta(stream, size, header_offset)?;
                    self.pending.link_target = Some(trim_field(&data).to_vec());
                }
                b'S' => {
                    return Err(ArchiveError::UnsupportedFeature {
                        format: FORMAT,
                        feature: "GNU sparse entries".into(),
                    });
                }
                b'V' => {
                    // Volume label: no caller-visible entry, skip its span.
                    stream.skip(size + block_padding(size)).map_err(|_| {
                        ArchiveError::corrupt(FORMAT, header_offset, "truncated volume label")
                    })?;
                }
                _ => return self.emit_entry(&block, size, typeflag, header_offset).map(Some),
            }
        }
    }

    /// Builds the caller-facing entry from a plain header block plus any
    /// pending overrides.
    fn emit_entry(
        &mut self,
        block: &[u8; BLOCK_SIZE],
        header_size: u64,
        typeflag: u8,
        header_offset: u64,
    ) -> Result<ParsedEntry> {
        let pending = std::mem::take(&mut self.pending);
        let global = &self.global;

        let name = pending.name.unwrap_or_else(|| joined_name(block));
        if name.is_empty() {
            return Err(ArchiveError::corrupt(FORMAT, header_offset, "empty entry name"));
        }
        if name.len() > self.max_name_len {
            return Err(ArchiveError::corrupt(
                FORMAT,
                header_offset,
                format!("entry name of {} bytes exceeds limit", name.len()),
            ));
        }

        let link_target = pending
            .link_target
            .unwrap_or_else(|| trim_field(&block[157..257]).to_vec());

        let size = pending
            .size
            .or_else(|| global.get("size").and_then(|v| v.parse().ok()))
            .unwrap_or(header_size);
        let mtime = pending
            .mtime
            .or_else(|| global.get("mtime").and_then(|v| parse_pax_time(v)))
            .or_else(|| parse_octal(&block[136..148]).ok());
        let mode = parse_octal(&block[100..108])
            .ok()
            .map(|m| u32::try_from(m & 0o7777).unwrap_or(0o7777));

        let kind = match typeflag {
            b'1' => EntryKind::Hardlink {
                target: link_target,
            },
            b'2' => EntryKind::Symlink {
                target: link_target,
            },
            b'3' => EntryKind::CharDevice,
            b'4' => EntryKind::BlockDevice,
            b'5' => EntryKind::Directory,
            b'6' => EntryKind::Fifo,
            // '0', NUL, '7' (contiguous), and unrecognized flags are all
            // regular files per POSIX.
            _ => EntryKind::File,
        };

        // Files honor a PAX size override; for other kinds the header's
        // own size field dictates the span to skip, whatever it claims.
        let span = if kind.is_file() { size } else { header_size };

        let metadata = EntryMetadata {
            name,
            size: Some(if kind.is_bodiless() { 0 } else { size }),
            kind,
            mode,
            mtime,
        };

        Ok(ParsedEntry {
            metadata,
            plan: BodyPlan::Raw {
                size: span,
                padding: block_padding(span),
            },
        })
    }

    /// Reads the data span of a metadata pseudo-entry (PAX, long name).
    fn read_meta(&self, stream: &mut Stream, size: u64, offset: u64) -> Result<Vec<u8>> {
        if size > self.max_meta_len as u64 {
            return Err(ArchiveError::corrupt(
                FORMAT,
                offset,
                format!("extended header of {size} bytes exceeds limit"),
            ));
        }
        let len = usize::try_from(size).map_err(|_| {
            ArchiveError::corrupt(FORMAT, offset, "extended header size overflow")
        })?;
        let mut data = vec![0u8; len];
        stream.read_exact(&mut data).map_err(|_| {
            ArchiveError::corrupt(FORMAT, offset, "truncated extended header")
        })?;
        stream
            .skip(block_padding(size))
            .map_err(|_| ArchiveError::corrupt(FORMAT, offset, "truncated extended header"))?;
        Ok(data)
    }

    fn apply_pax(
        &mut self,
        records: &HashMap<String, String>,
        offset: u64,
    ) -> Result<()> {
        if let Some(path) = records.get("path") {
            if path.len() > self.max_name_len {
                return Err(ArchiveError::corrupt(
                    FORMAT,
                    offset,
                    "PAX path exceeds name length limit",
                ));
            }
            self.pending.name = Some(path.clone().into_bytes());
        }
        if let Some(linkpath) = records.get("linkpath") {
            self.pending.link_target = Some(linkpath.clone().into_bytes());
        }
        if let Some(size) = records.get("size") {
            self.pending.size = Some(size.parse().map_err(|_| {
                ArchiveError::corrupt(FORMAT, offset, "invalid PAX size record")
            })?);
        }
        if let Some(mtime) = records.get("mtime") {
            self.pending.mtime = parse_pax_time(mtime);
        }
        Ok(())
    }
}

/// Joins the ustar prefix field with the name field.
fn joined_name(block: &[u8; BLOCK_SIZE]) -> Vec<u8> {
    let name = trim_field(&block[0..100]);
    if &block[257..262] == b"ustar" {
        let prefix = trim_field(&block[345..500]);
        if !prefix.is_empty() {
            let mut full = Vec::with_capacity(prefix.len() + 1 + name.len());
            full.extend_from_slice(prefix);
            full.push(b'/');
            full.extend_from_slice(name);
            return full;
        }
    }
    name.to_vec()
}

/// Reads one 512-byte block; `None` on clean EOF at a block boundary.
fn read_block(stream: &mut Stream, offset: u64) -> Result<Option<[u8; BLOCK_SIZE]>> {
    let mut block = [0u8; BLOCK_SIZE];
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        let n = stream.read(&mut block[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ArchiveError::corrupt(FORMAT, offset, "truncated header block"));
        }
        filled += n;
    }
    Ok(Some(block))
}

/// Parses PAX records: `"<len> <key>=<value>\n"` repeated.
fn parse_pax_records(data: &[u8]) -> HashMap<String, String> {
    let mut records = HashMap::new();
    let mut pos = 0;

    while pos < data.len() {
        let Some(space) = data[pos..].iter().position(|&b| b == b' ') else {
            break;
        };
        let Ok(len_str) = std::str::from_utf8(&data[pos..pos + space]) else {
            break;
        };
        let Ok(record_len) = len_str.trim().parse::<usize>() else {
            break;
        };
        if record_len == 0 || pos + record_len > data.len() {
            break;
        }

        let mut value_end = pos + record_len;
        if data.get(value_end - 1) == Some(&b'\n') {
            value_end -= 1;
        }
        let record = &data[pos + space + 1..value_end];
        if let Some(eq) = record.iter().position(|&b| b == b'=') {
            let key = String::from_utf8_lossy(&record[..eq]).into_owned();
            let value = String::from_utf8_lossy(&record[eq + 1..]).into_owned();
            records.insert(key, value);
        }
        pos += record_len;
    }

    records
}

/// PAX times may carry a fractional part; only whole seconds are kept.
fn parse_pax_time(value: &str) -> Option<u64> {
    let whole = value.split('.').next().unwrap_or(value);
    whole.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::formats::filters::resolve_chain;
    use crate::source::ByteSource;

    fn stream_of(data: Vec<u8>) -> Stream {
        resolve_chain(ByteSource::from_bytes(data), &ReadConfig::default())
            .unwrap()
            .0
    }

    /// Minimal hand-rolled ustar header for unit tests; integration
    /// tests cross-check against the `tar` crate's writer.
    fn make_header(name: &str, size: u64, typeflag: u8) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[..name.len()].copy_from_slice(name.as_bytes());
        block[100..107].copy_from_slice(b"0000644");
        block[108..115].copy_from_slice(b"0000000");
        block[116..123].copy_from_slice(b"0000000");
        let size_field = format!("{size:011o}");
        block[124..135].copy_from_slice(size_field.as_bytes());
        block[136..147].copy_from_slice(b"14000000000");
        block[156] = typeflag;
        block[257..263].copy_from_slice(b"ustar\0");
        block[263..265].copy_from_slice(b"00");
        let sum: u64 = block
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                if (148..156).contains(&i) {
                    u64::from(b' ')
                } else {
                    u64::from(b)
                }
            })
            .sum();
        let cksum = format!("{sum:06o}\0 ");
        block[148..156].copy_from_slice(cksum.as_bytes());
        block
    }

    fn archive_of(blocks: Vec<Vec<u8>>) -> Vec<u8> {
        let mut data: Vec<u8> = blocks.into_iter().flatten().collect();
        data.extend_from_slice(&[0u8; BLOCK_SIZE * 2]);
        data
    }

    #[test]
    fn test_parse_octal() {
        assert_eq!(parse_octal(b"0000644\0"), Ok(0o644));
        assert_eq!(parse_octal(b"   17 "), Ok(0o17));
        assert_eq!(parse_octal(b"\0\0\0"), Ok(0));
        assert!(parse_octal(b"9bad").is_err());
    }

    #[test]
    fn test_parse_octal_base256() {
        // 0x80 marker then big-endian bytes
        let field = [0x80, 0, 0, 0, 0, 0, 0x01, 0x00];
        assert_eq!(parse_octal(&field), Ok(256));
    }

    #[test]
    fn test_block_padding() {
        assert_eq!(block_padding(0), 0);
        assert_eq!(block_padding(1), 511);
        assert_eq!(block_padding(512), 0);
        assert_eq!(block_padding(513), 511);
    }

    #[test]
    fn test_checksum_roundtrip() {
        let block = make_header("file.txt", 5, b'0');
        assert!(checksum_valid(&block));
        let mut bad = block;
        bad[0] ^= 0xFF;
        assert!(!checksum_valid(&bad));
    }

    #[test]
    fn test_single_file_entry() {
        let header = make_header("hello.txt", 5, b'0');
        let mut body = b"world".to_vec();
        body.resize(BLOCK_SIZE, 0);
        let mut stream = stream_of(archive_of(vec![header.to_vec(), body]));

        let mut reader = TarReader::new(&ReadConfig::default());
        let entry = reader.next_entry(&mut stream).unwrap().unwrap();
        assert_eq!(entry.metadata.name, b"hello.txt");
        assert_eq!(entry.metadata.size, Some(5));
        assert_eq!(entry.metadata.mode, Some(0o644));
        assert!(entry.metadata.kind.is_file());
        match entry.plan {
            BodyPlan::Raw { size, padding } => {
                assert_eq!(size, 5);
                assert_eq!(padding, 507);
            }
            BodyPlan::Zip(_) => panic!("tar produced a zip plan"),
        }
    }

    #[test]
    fn test_end_of_archive_zero_block() {
        let mut stream = stream_of(vec![0u8; BLOCK_SIZE * 2]);
        let mut reader = TarReader::new(&ReadConfig::default());
        assert!(reader.next_entry(&mut stream).unwrap().is_none());
        // Terminal: repeated calls stay exhausted
        assert!(reader.next_entry(&mut stream).unwrap().is_none());
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        let mut stream = stream_of(vec![b'x'; 100]);
        let mut reader = TarReader::new(&ReadConfig::default());
        let err = reader.next_entry(&mut stream).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt { format: "tar", .. }));
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let mut header = make_header("a", 0, b'0');
        header[5] = b'!'; // breaks the checksum
        let mut stream = stream_of(archive_of(vec![header.to_vec()]));
        let mut reader = TarReader::new(&ReadConfig::default());
        let err = reader.next_entry(&mut stream).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Corrupt { format: "tar", offset: 0, .. }
        ));
    }

    #[test]
    fn test_symlink_entry() {
        let mut header = make_header("link", 0, b'2');
        header[157..163].copy_from_slice(b"target");
        // fix checksum after editing linkname
        let sum: u64 = header
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                if (148..156).contains(&i) {
                    u64::from(b' ')
                } else {
                    u64::from(b)
                }
            })
            .sum();
        header[148..156].copy_from_slice(format!("{sum:06o}\0 ").as_bytes());

        let mut stream = stream_of(archive_of(vec![header.to_vec()]));
        let mut reader = TarReader::new(&ReadConfig::default());
        let entry = reader.next_entry(&mut stream).unwrap().unwrap();
        assert_eq!(entry.metadata.kind.link_target(), Some(&b"target"[..]));
        assert_eq!(entry.metadata.size, Some(0));
    }

    #[test]
    fn test_directory_entry() {
        let header = make_header("some/dir/", 0, b'5');
        let mut stream = stream_of(archive_of(vec![header.to_vec()]));
        let mut reader = TarReader::new(&ReadConfig::default());
        let entry = reader.next_entry(&mut stream).unwrap().unwrap();
        assert!(entry.metadata.kind.is_directory());
        assert_eq!(entry.metadata.size, Some(0));
    }

    #[test]
    fn test_pax_path_override() {
        let long_path = "dir/".repeat(30) + "file.txt";
        let record = format!("path={long_path}\n");
        let record = format!("{} {record}", record.len() + 4);
        let mut pax_data = record.into_bytes();
        let pax_header = make_header("ignored", pax_data.len() as u64, b'x');
        pax_data.resize(BLOCK_SIZE, 0);
        let file_header = make_header("short", 0, b'0');

        let mut stream = stream_of(archive_of(vec![
            pax_header.to_vec(),
            pax_data,
            file_header.to_vec(),
        ]));
        let mut reader = TarReader::new(&ReadConfig::default());
        let entry = reader.next_entry(&mut stream).unwrap().unwrap();
        assert_eq!(entry.metadata.name, long_path.as_bytes());
    }

    #[test]
    fn test_pax_records_parser() {
        let data = b"30 mtime=1321711775.972059463\n15 path=abc/def\n";
        let records = parse_pax_records(data);
        assert_eq!(records.get("path").map(String::as_str), Some("abc/def"));
        assert_eq!(
            records.get("mtime").and_then(|v| parse_pax_time(v)),
            Some(1_321_711_775)
        );
    }

    #[test]
    fn test_sparse_entry_unsupported() {
        let header = make_header("sparse.bin", 0, b'S');
        let mut stream = stream_of(archive_of(vec![header.to_vec()]));
        let mut reader = TarReader::new(&ReadConfig::default());
        let err = reader.next_entry(&mut stream).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsupportedFeature { format: "tar", .. }));
    }

    #[test]
    fn test_oversized_pax_header_rejected() {
        let header = make_header("x", u64::from(u32::MAX), b'x');
        let mut stream = stream_of(archive_of(vec![header.to_vec()]));
        let mut reader = TarReader::new(&ReadConfig::default());
        let err = reader.next_entry(&mut stream).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt { .. }));
    }

    #[test]
    fn test_name_length_limit() {
        let config = ReadConfig {
            max_name_len: 4,
            ..Default::default()
        };
        let header = make_header("longer-than-four", 0, b'0');
        let mut stream = stream_of(archive_of(vec![header.to_vec()]));
        let mut reader = TarReader::new(&config);
        let err = reader.next_entry(&mut stream).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt { .. }));
    }
}
