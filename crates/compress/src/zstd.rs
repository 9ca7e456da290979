#![allow(clippy::module_name_repetitions)]

//! Streaming Zstandard helpers.
//!
//! The interface mirrors the zlib helpers so higher layers can swap algorithms
//! without reworking their plumbing. Decoding accepts concatenated frames.

use std::io::{self, BufReader, Read, Write};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};
use crate::zlib::CompressionLevel;
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

/// Zstandard frame magic number, little endian `0xFD2FB528`.
pub const MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];

/// Frame encoder that tallies the bytes it hands to its sink.
pub struct CountingZstdEncoder<W = CountingSink>
where
    W: Write,
{
    inner: ZstdEncoder<'static, CountingWriter<W>>,
}

impl CountingZstdEncoder<CountingSink> {
    /// Encoder whose output is only measured, never kept.
    pub fn new(level: CompressionLevel) -> io::Result<Self> {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingZstdEncoder<W>
where
    W: Write,
{
    /// Encoder writing frames into `sink`.
    pub fn with_sink(sink: W, level: CompressionLevel) -> io::Result<Self> {
        let writer = CountingWriter::new(sink);
        let encoder = ZstdEncoder::new(writer, zstd_level(level))?;
        Ok(Self { inner: encoder })
    }

    /// Compressed bytes emitted so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.inner.get_ref().bytes()
    }

    /// Writes the end mark and hands back `sink` with the final compressed length.
    pub fn finish_into_inner(self) -> io::Result<(W, u64)> {
        let writer = self.inner.finish()?;
        Ok(writer.into_parts())
    }
}

impl<W: Write> Write for CountingZstdEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingZstdEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in a Zstandard decoder.
pub fn decoder<R: Read>(reader: R) -> io::Result<ZstdDecoder<'static, BufReader<R>>> {
    ZstdDecoder::new(reader)
}

/// One-shot compression of `input`.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = ZstdEncoder::new(Vec::new(), zstd_level(level))?;
    encoder.write_all(input)?;
    encoder.finish()
}

/// One-shot decompression of a whole frame sequence.
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder(input)?.read_to_end(&mut output)?;
    Ok(output)
}

fn zstd_level(level: CompressionLevel) -> i32 {
    level.scaled(1, 3, 19) as i32
}
