//! Gzip (RFC 1952) helpers built on `flate2`.
//!
//! Decoding accepts multi-member streams, which is what `cat a.gz b.gz`
//! produces and what most tooling expects.

use std::io::{self, Read, Write};

use flate2::{read::MultiGzDecoder, write::GzEncoder};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};
use crate::zlib::CompressionLevel;

/// Gzip member header: ID1, ID2.
pub const MAGIC: &[u8] = &[0x1F, 0x8B];

/// Streaming gzip encoder that records the number of compressed bytes produced.
pub struct CountingGzipEncoder<W = CountingSink>
where
    W: Write,
{
    inner: GzEncoder<CountingWriter<W>>,
}

impl CountingGzipEncoder<CountingSink> {
    /// Creates an encoder that discards output while counting its length.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingGzipEncoder<W>
where
    W: Write,
{
    /// Creates an encoder that writes compressed bytes into `sink`.
    #[must_use]
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        Self {
            inner: GzEncoder::new(CountingWriter::new(sink), level.into()),
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

impl<W: Write> Write for CountingGzipEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingGzipEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in a multi-member gzip decoder.
#[must_use]
pub fn decoder<R: Read>(reader: R) -> MultiGzDecoder<R> {
    MultiGzDecoder::new(reader)
}

/// Compresses `input` into a new [`Vec`].
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), level.into());
    encoder.write_all(input)?;
    encoder.finish()
}

/// Decompresses `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder(input).read_to_end(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::has_magic;

    #[test]
    fn output_starts_with_magic() {
        let compressed = compress_to_vec(b"payload", CompressionLevel::Fast).expect("compress");
        assert!(has_magic(&compressed, MAGIC));
    }

    #[test]
    fn concatenated_members_decode_as_one_stream() {
        let mut joined = compress_to_vec(b"first ", CompressionLevel::Default).expect("first");
        joined.extend(compress_to_vec(b"second", CompressionLevel::Default).expect("second"));
        assert_eq!(decompress_to_vec(&joined).expect("decode"), b"first second");
    }

    #[test]
    fn counting_encoder_matches_sink_length() {
        let mut encoder = CountingGzipEncoder::with_sink(Vec::new(), CompressionLevel::Best);
        encoder.write_all(b"payload payload payload").expect("write");
        let (compressed, bytes) = encoder.finish_into_inner().expect("finish");
        assert_eq!(bytes as usize, compressed.len());
    }
}
