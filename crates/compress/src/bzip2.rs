//! Bzip2 helpers. Decoding accepts concatenated streams as produced by
//! parallel compressors such as `pbzip2`.

use std::io::{self, Read, Write};

use bzip2::{Compression, read::MultiBzDecoder, write::BzEncoder};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};
use crate::zlib::CompressionLevel;

/// Bzip2 stream signature followed by the version byte `h`.
pub const MAGIC: &[u8] = b"BZh";

/// Streaming encoder that records the number of compressed bytes produced.
pub struct CountingBzip2Encoder<W = CountingSink>
where
    W: Write,
{
    inner: BzEncoder<CountingWriter<W>>,
}

impl CountingBzip2Encoder<CountingSink> {
    /// Creates an encoder that discards output while counting its length.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingBzip2Encoder<W>
where
    W: Write,
{
    /// Creates an encoder that writes compressed bytes into `sink`.
    #[must_use]
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        let block_size = Compression::new(level.scaled(1, 6, 9));
        Self {
            inner: BzEncoder::new(CountingWriter::new(sink), block_size),
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

impl<W: Write> Write for CountingBzip2Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingBzip2Encoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in a multi-stream bzip2 decoder.
#[must_use]
pub fn decoder<R: Read>(reader: R) -> MultiBzDecoder<R> {
    MultiBzDecoder::new(reader)
}

/// Compresses `input` into a new [`Vec`].
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = CountingBzip2Encoder::with_sink(Vec::new(), level);
    encoder.write_all(input)?;
    encoder.finish_into_inner().map(|(sink, _)| sink)
}

/// Decompresses `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder(input).read_to_end(&mut output)?;
    Ok(output)
}
