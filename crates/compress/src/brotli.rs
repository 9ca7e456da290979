//! Brotli helpers.
//!
//! Brotli streams have no magic number, so this module exposes no `MAGIC`
//! constant; identification has to rely on the `.br` file name.

use std::io::{self, Read, Write};

use brotli::{CompressorWriter, Decompressor};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};
use crate::zlib::CompressionLevel;

const BUFFER_SIZE: usize = 4096;
const WINDOW_BITS: u32 = 22;

/// Streaming encoder that records the number of compressed bytes produced.
pub struct CountingBrotliEncoder<W = CountingSink>
where
    W: Write,
{
    inner: CompressorWriter<CountingWriter<W>>,
}

impl CountingBrotliEncoder<CountingSink> {
    /// Creates an encoder that discards output while counting its length.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingBrotliEncoder<W>
where
    W: Write,
{
    /// Creates an encoder that writes compressed bytes into `sink`.
    #[must_use]
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        Self {
            inner: CompressorWriter::new(
                CountingWriter::new(sink),
                BUFFER_SIZE,
                quality(level),
                WINDOW_BITS,
            ),
        }
    }

    /// Returns the number of compressed bytes produced so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.inner.get_ref().bytes()
    }

    /// Completes the stream and returns the sink with the compressed length.
    pub fn finish_into_inner(mut self) -> io::Result<(W, u64)> {
        self.inner.flush()?;
        Ok(self.inner.into_inner().into_parts())
    }
}

impl<W: Write> Write for CountingBrotliEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingBrotliEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in a Brotli decoder.
#[must_use]
pub fn decoder<R: Read>(reader: R) -> Decompressor<R> {
    Decompressor::new(reader, BUFFER_SIZE)
}

/// Compresses `input` into a new [`Vec`].
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = CountingBrotliEncoder::with_sink(Vec::new(), level);
    encoder.write_all(input)?;
    encoder.finish_into_inner().map(|(sink, _)| sink)
}

/// Decompresses `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder(input).read_to_end(&mut output)?;
    Ok(output)
}

// Brotli qualities run 0..=11; precise levels 1..=9 are stretched onto that range.
fn quality(level: CompressionLevel) -> u32 {
    match level {
        CompressionLevel::Precise(value) => (u32::from(value.get()) * 11).div_ceil(9),
        named => named.scaled(1, 9, 11),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_payload() {
        let payload = b"brotli payload brotli payload";
        let compressed = compress_to_vec(payload, CompressionLevel::Default).expect("compress");
        assert_eq!(decompress_to_vec(&compressed).expect("decode"), payload);
    }

    #[test]
    fn precise_levels_stay_within_quality_range() {
        for level in 1..=9 {
            let q = quality(CompressionLevel::from_numeric(level).expect("level"));
            assert!((1..=11).contains(&q));
        }
    }
}
