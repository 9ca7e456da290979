//! XZ helpers backed by liblzma through `xz2`.

use std::io::{self, Read, Write};

use xz2::{read::XzDecoder, write::XzEncoder};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};
use crate::zlib::CompressionLevel;

/// XZ stream header magic.
pub const MAGIC: &[u8] = &[0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// Streaming encoder that records the number of compressed bytes produced.
pub struct CountingXzEncoder<W = CountingSink>
where
    W: Write,
{
    inner: XzEncoder<CountingWriter<W>>,
}

impl CountingXzEncoder<CountingSink> {
    /// Creates an encoder that discards output while counting its length.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingXzEncoder<W>
where
    W: Write,
{
    /// Creates an encoder that writes compressed bytes into `sink`.
    #[must_use]
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        Self {
            inner: XzEncoder::new(CountingWriter::new(sink), level.scaled(1, 6, 9)),
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

impl<W: Write> Write for CountingXzEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingXzEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in an XZ decoder that accepts concatenated streams.
#[must_use]
pub fn decoder<R: Read>(reader: R) -> XzDecoder<R> {
    XzDecoder::new_multi_decoder(reader)
}

/// Compresses `input` into a new [`Vec`].
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = XzEncoder::new(Vec::new(), level.scaled(1, 6, 9));
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
    fn round_trip_starts_with_magic() {
        let compressed = compress_to_vec(b"xz payload", CompressionLevel::Fast).expect("compress");
        assert!(has_magic(&compressed, MAGIC));
        assert_eq!(decompress_to_vec(&compressed).expect("decode"), b"xz payload");
    }
}
