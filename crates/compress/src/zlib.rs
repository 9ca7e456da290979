//! # Overview
//!
//! Zlib (RFC 1950) helpers and the [`CompressionLevel`] knob shared by every
//! codec in the crate. [`CountingZlibEncoder`] accepts incremental input while
//! tracking the number of bytes produced by the compressor, so callers can
//! report compressed sizes without buffering the payload.
//!
//! # Examples
//!
//! ```
//! use compress::zlib::{CompressionLevel, compress_to_vec, decompress_to_vec};
//!
//! let data = b"highly compressible payload";
//! let compressed = compress_to_vec(data, CompressionLevel::Best).unwrap();
//! let decoded = decompress_to_vec(&compressed).unwrap();
//! assert_eq!(decoded, data);
//! ```

use std::{
    fmt,
    io::{self, Read, Write},
    num::NonZeroU8,
};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};

/// First byte of a zlib stream using a 32 KiB deflate window.
///
/// The byte alone is a weak signal, so [`matches_header`] also validates the
/// FCHECK bits of the second byte.
pub const MAGIC: &[u8] = &[0x78];

/// Compression levels recognised by the encoders.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionLevel {
    /// Favour speed over compression ratio.
    Fast,
    /// Use the codec's default balance between speed and ratio.
    #[default]
    Default,
    /// Favour the best possible compression ratio.
    Best,
    /// Use an explicit level in the range `1..=9`.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Creates a [`CompressionLevel::Precise`] value from an explicit numeric level.
    ///
    /// The supplied `level` must fall within the inclusive range `1..=9`.
    pub fn from_numeric(level: u32) -> Result<Self, CompressionLevelError> {
        u8::try_from(level)
            .ok()
            .filter(|value| (1..=9).contains(value))
            .and_then(NonZeroU8::new)
            .map(Self::Precise)
            .ok_or(CompressionLevelError::new(level))
    }

    /// Constructs a [`CompressionLevel::Precise`] variant from the provided level.
    #[must_use]
    pub const fn precise(level: NonZeroU8) -> Self {
        Self::Precise(level)
    }

    /// Maps the level onto a `fast..=best` numeric scale.
    ///
    /// Codecs with a wider range than zlib's `1..=9` scale the precise value
    /// themselves; this helper only resolves the three named presets.
    #[must_use]
    pub(crate) const fn scaled(self, fast: u32, default: u32, best: u32) -> u32 {
        match self {
            Self::Fast => fast,
            Self::Default => default,
            Self::Best => best,
            Self::Precise(value) => value.get() as u32,
        }
    }
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Fast => Compression::fast(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
            CompressionLevel::Precise(value) => Compression::new(u32::from(value.get())),
        }
    }
}

/// Error returned when a requested compression level falls outside `1..=9`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompressionLevelError {
    level: u32,
}

impl CompressionLevelError {
    const fn new(level: u32) -> Self {
        Self { level }
    }

    /// Returns the invalid compression level that triggered the error.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl fmt::Display for CompressionLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compression level {} is outside the supported range 1-9",
            self.level
        )
    }
}

impl std::error::Error for CompressionLevelError {}

/// Streaming zlib encoder that records the number of compressed bytes produced.
pub struct CountingZlibEncoder<W = CountingSink>
where
    W: Write,
{
    inner: ZlibEncoder<CountingWriter<W>>,
}

impl CountingZlibEncoder<CountingSink> {
    /// Creates an encoder that discards output while counting its length.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingZlibEncoder<W>
where
    W: Write,
{
    /// Creates an encoder that writes compressed bytes into `sink`.
    #[must_use]
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        Self {
            inner: ZlibEncoder::new(CountingWriter::new(sink), level.into()),
        }
    }

    /// Returns the number of compressed bytes produced so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.inner.get_ref().bytes()
    }

    /// Completes the stream and returns the sink with the compressed length.
    pub fn finish_into_inner(self) -> io::Result<(W, u64)> {
        let writer = self.inner.finish()?;
        Ok(writer.into_parts())
    }
}

impl<W: Write> Write for CountingZlibEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingZlibEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in a zlib decoder.
#[must_use]
pub fn decoder<R: Read>(reader: R) -> ZlibDecoder<R> {
    ZlibDecoder::new(reader)
}

/// Returns `true` when `prefix` opens a plausible zlib stream.
///
/// Checks the deflate method nibble, the 32 KiB window, the FCHECK
/// divisibility rule and that no preset dictionary is required.
#[must_use]
pub fn matches_header(prefix: &[u8]) -> bool {
    let [cmf, flg, ..] = *prefix else {
        return false;
    };
    cmf == MAGIC[0] && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0 && flg & 0x20 == 0
}

/// Compresses `input` into a new [`Vec`].
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level.into());
    encoder.write_all(input)?;
    encoder.finish()
}

/// Decompresses `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder(input).read_to_end(&mut output)?;
    Ok(output)
}
