//! Entry body decode cursors.
//!
//! [`open_body`] turns a [`BodyPlan`] into a [`Body`]: a pull-on-demand
//! reader that owns the container stream for the duration of one entry.
//! Finishing the body drains whatever the caller left unread, discards
//! structural filler, and hands the stream back positioned at the next
//! entry header.

use std::io::BufRead;
use std::io::Read;

use flate2::bufread::DeflateDecoder;

use crate::ArchiveError;
use crate::Result;
use crate::formats::BodyPlan;
use crate::formats::Stream;
use crate::formats::zip;
use crate::formats::zip::ZipMethod;
use crate::formats::zipcrypto::ZipCryptoReader;
use crate::io::BoundedBufRead;

/// The compressed span of one zip member, possibly decrypted in flight.
///
/// Exists so a single [`DeflateDecoder`] type parameter covers both the
/// plain and the encrypted case.
enum RawSpan {
    Plain(BoundedBufRead<Stream>),
    Decrypted(ZipCryptoReader<BoundedBufRead<Stream>>),
}

impl RawSpan {
    /// Drains the rest of the span and recovers the container stream.
    fn finish(self) -> std::io::Result<Stream> {
        let mut bounded = match self {
            Self::Plain(bounded) => bounded,
            Self::Decrypted(decryptor) => decryptor.into_inner(),
        };
        bounded.drain()?;
        Ok(bounded.into_inner())
    }
}

impl Read for RawSpan {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(inner) => inner.read(out),
            Self::Decrypted(inner) => inner.read(out),
        }
    }
}

impl BufRead for RawSpan {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match self {
            Self::Plain(inner) => inner.fill_buf(),
            Self::Decrypted(inner) => inner.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Self::Plain(inner) => inner.consume(amt),
            Self::Decrypted(inner) => inner.consume(amt),
        }
    }
}

enum BodyReader {
    /// Verbatim span followed by alignment filler. tar, cpio, and plain
    /// stored zip members.
    Raw {
        span: BoundedBufRead<Stream>,
        padding: u64,
    },
    /// Encrypted stored zip member.
    Stored(ZipCryptoReader<BoundedBufRead<Stream>>),
    /// Deflated zip member, plain or encrypted.
    Deflate {
        decoder: DeflateDecoder<RawSpan>,
        /// A data descriptor follows the compressed span.
        descriptor: bool,
    },
}

/// Decode cursor over one entry's body.
///
/// Delivered bytes are capped at the declared uncompressed size when one
/// is known, so a lying header can never hand the caller more than the
/// metadata promised.
pub(crate) struct Body {
    reader: BodyReader,
    delivered: u64,
    cap: Option<u64>,
}

// The reader half owns decoders over the container stream, none of which
// are Debug, so only the accounting fields are shown.
impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("delivered", &self.delivered)
            .field("cap", &self.cap)
            .finish_non_exhaustive()
    }
}

/// Builds the decode cursor for `plan`, taking ownership of the container
/// stream.
///
/// Callers should check [`BodyPlan::needs_passphrase`] before handing the
/// stream over: failures here (missing or wrong passphrase, short read on
/// the encryption header) lose the stream and abort iteration.
pub(crate) fn open_body(
    plan: BodyPlan,
    stream: Stream,
    passphrase: Option<&[u8]>,
) -> Result<Body> {
    match plan {
        BodyPlan::Raw { size, padding } => Ok(Body {
            reader: BodyReader::Raw {
                span: BoundedBufRead::new(stream, Some(size)),
                padding,
            },
            delivered: 0,
            cap: None,
        }),
        BodyPlan::Zip(plan) => {
            let bounded = BoundedBufRead::new(stream, plan.compressed_size);
            if plan.encrypted {
                let passphrase = passphrase.ok_or(ArchiveError::MissingPassphrase)?;
                let mut decryptor = ZipCryptoReader::new(bounded, passphrase);
                let check = decryptor.read_check_byte()?;
                if check != plan.check_byte {
                    return Err(ArchiveError::Decryption {
                        reason: "passphrase verification byte mismatch".into(),
                    });
                }
                let reader = match plan.method {
                    ZipMethod::Stored => BodyReader::Stored(decryptor),
                    ZipMethod::Deflate => BodyReader::Deflate {
                        decoder: DeflateDecoder::new(RawSpan::Decrypted(decryptor)),
                        descriptor: false,
                    },
                };
                Ok(Body {
                    reader,
                    delivered: 0,
                    cap: plan.declared_size,
                })
            } else {
                let reader = match plan.method {
                    ZipMethod::Stored => BodyReader::Raw {
                        span: bounded,
                        padding: 0,
                    },
                    ZipMethod::Deflate => BodyReader::Deflate {
                        decoder: DeflateDecoder::new(RawSpan::Plain(bounded)),
                        descriptor: plan.compressed_size.is_none(),
                    },
                };
                Ok(Body {
                    reader,
                    delivered: 0,
                    cap: plan.declared_size,
                })
            }
        }
    }
}

impl Body {
    /// Reads the next chunk of decoded body bytes. Returns `Ok(0)` at the
    /// end of the body.
    pub(crate) fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let want = match self.cap {
            Some(cap) => {
                let left = cap.saturating_sub(self.delivered);
                usize::try_from(left.min(out.len() as u64)).unwrap_or(out.len())
            }
            None => out.len(),
        };
        if want == 0 {
            return Ok(0);
        }
        let n = match &mut self.reader {
            BodyReader::Raw { span, .. } => {
                let n = span.read(&mut out[..want])?;
                if n == 0 && span.remaining().is_some_and(|left| left > 0) {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "entry body ends before its declared size",
                    ));
                }
                n
            }
            BodyReader::Stored(decryptor) => decryptor.read(&mut out[..want])?,
            BodyReader::Deflate { decoder, .. } => decoder.read(&mut out[..want])?,
        };
        self.delivered += n as u64;
        Ok(n)
    }

    /// Drains the unread remainder and returns the container stream
    /// positioned at the next entry header.
    pub(crate) fn finish(self) -> std::io::Result<Stream> {
        match self.reader {
            BodyReader::Raw { mut span, padding } => {
                span.drain()?;
                let mut stream = span.into_inner();
                stream.skip(padding)?;
                Ok(stream)
            }
            BodyReader::Stored(decryptor) => {
                let mut bounded = decryptor.into_inner();
                bounded.drain()?;
                Ok(bounded.into_inner())
            }
            BodyReader::Deflate {
                mut decoder,
                descriptor,
            } => {
                // Run the decoder to its end so it consumes exactly the
                // compressed span, then discard any slack inside the
                // bound (trailing garbage a lying header smuggled in).
                std::io::copy(&mut decoder, &mut std::io::sink())?;
                let mut stream = decoder.into_inner().finish()?;
                if descriptor {
                    zip::consume_data_descriptor(&mut stream)?;
                }
                Ok(stream)
            }
        }
    }
}
