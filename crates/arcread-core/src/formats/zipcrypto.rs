//! Traditional PKWARE ("ZipCrypto") stream cipher.
//!
//! The legacy zip encryption scheme: three 32-bit keys seeded from the
//! passphrase and advanced by a CRC-32 schedule, producing one key-stream
//! byte per data byte. Cryptographically weak, but still what most
//! passphrase-protected zips in the wild use. Decryption only — writing
//! archives is out of scope.
//!
//! A 12-byte encryption header precedes each member's data. Its last
//! byte doubles as a passphrase check: it must match the high byte of
//! the member's CRC-32. One byte means a wrong passphrase slips through
//! about 1 time in 256 — the format offers nothing stronger up front.

use std::io::BufRead;
use std::io::Read;

/// Size of the per-member encryption header.
pub(crate) const HEADER_LEN: usize = 12;

/// CRC-32 table (reflected polynomial `0xEDB88320`), built at compile
/// time for the key schedule.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

const fn crc32_step(crc: u32, byte: u8) -> u32 {
    CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
}

/// ZipCrypto key state.
#[derive(Debug, Clone)]
pub(crate) struct ZipCrypto {
    key0: u32,
    key1: u32,
    key2: u32,
}

impl ZipCrypto {
    /// Seeds the key state from a passphrase.
    pub(crate) fn new(passphrase: &[u8]) -> Self {
        let mut cipher = Self {
            key0: 0x1234_5678,
            key1: 0x2345_6789,
            key2: 0x3456_7890,
        };
        for &byte in passphrase {
            cipher.update(byte);
        }
        cipher
    }

    #[inline]
    fn update(&mut self, plain: u8) {
        self.key0 = crc32_step(self.key0, plain);
        self.key1 = self
            .key1
            .wrapping_add(self.key0 & 0xFF)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.key2 = crc32_step(self.key2, (self.key1 >> 24) as u8);
    }

    #[inline]
    fn stream_byte(&self) -> u8 {
        let temp = u16::try_from(self.key2 & 0xFFFF).unwrap_or(0) | 2;
        ((temp.wrapping_mul(temp ^ 1)) >> 8) as u8
    }

    /// Decrypts one byte and advances the key state.
    #[inline]
    pub(crate) fn decrypt_byte(&mut self, cipher_byte: u8) -> u8 {
        let plain = cipher_byte ^ self.stream_byte();
        self.update(plain);
        plain
    }

    /// Encrypts one byte and advances the key state.
    ///
    /// Only used by tests to build encrypted fixtures; the engine never
    /// writes archives.
    #[cfg(test)]
    pub(crate) fn encrypt_byte(&mut self, plain: u8) -> u8 {
        let out = plain ^ self.stream_byte();
        self.update(plain);
        out
    }
}

/// Reader adaptor that decrypts a ZipCrypto stream.
///
/// Implements [`BufRead`] by decrypting ahead into an internal buffer,
/// so exact-consumption decoders can sit directly on top.
pub(crate) struct ZipCryptoReader<R> {
    inner: R,
    cipher: ZipCrypto,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> ZipCryptoReader<R> {
    /// Wraps `inner`, seeding the cipher from `passphrase`. The 12-byte
    /// encryption header is *not* consumed here; call
    /// [`read_check_byte`](Self::read_check_byte) first.
    pub(crate) fn new(inner: R, passphrase: &[u8]) -> Self {
        Self {
            inner,
            cipher: ZipCrypto::new(passphrase),
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Consumes the encryption header and returns its final byte, which
    /// callers compare against the member's CRC-32 high byte.
    pub(crate) fn read_check_byte(&mut self) -> std::io::Result<u8> {
        let mut header = [0u8; HEADER_LEN];
        self.inner.read_exact(&mut header)?;
        let mut last = 0;
        for byte in header {
            last = self.cipher.decrypt_byte(byte);
        }
        Ok(last)
    }

    /// Consumes the wrapper, returning the inner reader.
    pub(crate) fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ZipCryptoReader<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for ZipCryptoReader<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.buf.resize(4096, 0);
            self.pos = 0;
            let n = self.inner.read(&mut self.buf)?;
            self.buf.truncate(n);
            for byte in &mut self.buf {
                *byte = self.cipher.decrypt_byte(*byte);
            }
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}
