//! Shared fixture builders for integration tests.
//!
//! tar and zip fixtures are produced by independent writer crates so the
//! reader is checked against someone else's output; cpio and encrypted
//! zip fixtures are written out by hand, field by field.

#![allow(dead_code, clippy::unwrap_used)]

use std::io::Cursor;
use std::io::Write;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

/// Builds a ustar archive with regular-file entries.
pub fn tar_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_ustar();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Builds a zip archive, deflate-compressed.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_archive_with(entries, CompressionMethod::Deflated)
}

/// Builds a zip archive with stored (uncompressed) members.
pub fn zip_archive_stored(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_archive_with(entries, CompressionMethod::Stored)
}

fn zip_archive_with(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Builds a newc-format cpio archive with regular-file entries.
pub fn cpio_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, data) in entries {
        push_cpio_entry(&mut out, name, 0o100_644, data);
    }
    push_cpio_entry(&mut out, "TRAILER!!!", 0, b"");
    out
}

fn push_cpio_entry(out: &mut Vec<u8>, name: &str, mode: u32, data: &[u8]) {
    out.extend_from_slice(b"070701");
    let fields = [
        1u64,                     // ino
        u64::from(mode),          // mode
        0,                        // uid
        0,                        // gid
        1,                        // nlink
        1_700_000_000,            // mtime
        data.len() as u64,        // filesize
        0,                        // devmajor
        0,                        // devminor
        0,                        // rdevmajor
        0,                        // rdevminor
        name.len() as u64 + 1,    // namesize incl NUL
        0,                        // check
    ];
    for value in fields {
        out.extend_from_slice(format!("{value:08X}").as_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out.extend_from_slice(data);
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Independent ZipCrypto keystream for building encrypted fixtures.
struct Keys {
    k: [u32; 3],
}

impl Keys {
    fn new(passphrase: &[u8]) -> Self {
        let mut keys = Self {
            k: [0x1234_5678, 0x2345_6789, 0x3456_7890],
        };
        for &byte in passphrase {
            keys.update(byte);
        }
        keys
    }

    fn crc32(mut crc: u32, byte: u8) -> u32 {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
        crc
    }

    fn update(&mut self, plain: u8) {
        self.k[0] = Self::crc32(self.k[0], plain);
        self.k[1] = self.k[1]
            .wrapping_add(self.k[0] & 0xFF)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.k[2] = Self::crc32(self.k[2], (self.k[1] >> 24) as u8);
    }

    fn encrypt(&mut self, plain: u8) -> u8 {
        let temp = (self.k[2] & 0xFFFF) as u16 | 2;
        let stream = (temp.wrapping_mul(temp ^ 1) >> 8) as u8;
        self.update(plain);
        plain ^ stream
    }
}

fn crc32_of(data: &[u8]) -> u32 {
    !data.iter().fold(u32::MAX, |crc, &byte| Keys::crc32(crc, byte))
}

/// Builds a zip archive with a single ZipCrypto-encrypted stored member.
pub fn encrypted_zip(passphrase: &[u8], name: &str, data: &[u8]) -> Vec<u8> {
    let crc = crc32_of(data);

    // 12-byte encryption header; the last byte must match the CRC high
    // byte so readers can verify the passphrase.
    let mut plain = vec![0x5Au8; 12];
    plain[11] = (crc >> 24) as u8;
    plain.extend_from_slice(data);
    let mut keys = Keys::new(passphrase);
    let payload: Vec<u8> = plain.into_iter().map(|b| keys.encrypt(b)).collect();

    let mut out = Vec::new();
    out.extend_from_slice(b"PK\x03\x04");
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&1u16.to_le_bytes()); // flags: encrypted
    out.extend_from_slice(&0u16.to_le_bytes()); // method: stored
    out.extend_from_slice(&0u16.to_le_bytes()); // time
    out.extend_from_slice(&0x5721u16.to_le_bytes()); // date: 2023-09-01
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra len
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&payload);
    // Terminating end-of-central-directory record (no central entries
    // are needed for a forward-only reader).
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0u8; 18]);
    out
}

/// Builds a zip archive with one deflated member whose sizes live in a
/// trailing data descriptor, as streaming zip writers produce.
pub fn descriptor_zip(name: &str, data: &[u8]) -> Vec<u8> {
    let compressed = deflate(data);
    let crc = crc32_of(data);

    let mut out = Vec::new();
    out.extend_from_slice(b"PK\x03\x04");
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes()); // flags: data descriptor
    out.extend_from_slice(&8u16.to_le_bytes()); // method: deflate
    out.extend_from_slice(&0u32.to_le_bytes()); // time + date
    out.extend_from_slice(&[0u8; 12]); // crc + sizes unknown up front
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&compressed);
    out.extend_from_slice(b"PK\x07\x08");
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0u8; 18]);
    out
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder =
        flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with gzip.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with bzip2.
pub fn bzip2_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with xz.
pub fn xz_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with zstd.
pub fn zstd_compress(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 0).unwrap()
}
