#![allow(clippy::module_name_repetitions)]

//! Streaming LZ4 frame helpers.
//!
//! Only the frame format is supported; raw LZ4 blocks carry no header and
//! cannot be identified from a stream.

use std::io::{self, BufReader, Read, Write};

use crate::common::{CountingSink, CountingWriter, StreamEncoder};
use crate::zlib::CompressionLevel;
use lz4_flex::frame::{BlockMode, BlockSize, FrameDecoder, FrameEncoder, FrameInfo};

/// LZ4 frame magic number, little endian `0x184D2204`.
pub const MAGIC: &[u8] = &[0x04, 0x22, 0x4D, 0x18];

/// Frame encoder that tallies the bytes it hands to its sink.
pub struct CountingLz4Encoder<W = CountingSink>
where
    W: Write,
{
    inner: FrameEncoder<CountingWriter<W>>,
}

impl CountingLz4Encoder<CountingSink> {
    /// Encoder whose output is only measured, never kept.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }
}

impl<W> CountingLz4Encoder<W>
where
    W: Write,
{
    /// Encoder writing frames into `sink`.
    #[must_use]
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        let writer = CountingWriter::new(sink);
        let encoder = FrameEncoder::with_frame_info(frame_info_for_level(level), writer);
        Self { inner: encoder }
    }

    /// Compressed bytes emitted so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.inner.get_ref().bytes()
    }

    /// Writes the end mark and hands back `sink` with the final compressed length.
    pub fn finish_into_inner(self) -> io::Result<(W, u64)> {
        let writer = self.inner.finish().map_err(io::Error::other)?;
        Ok(writer.into_parts())
    }
}

impl<W: Write> Write for CountingLz4Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> StreamEncoder for CountingLz4Encoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

/// Wraps `reader` in an LZ4 frame decoder.
#[must_use]
pub fn decoder<R: Read>(reader: R) -> FrameDecoder<BufReader<R>> {
    FrameDecoder::new(BufReader::new(reader))
}

/// One-shot compression of `input`.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = FrameEncoder::with_frame_info(frame_info_for_level(level), Vec::new());
    encoder.write_all(input)?;
    encoder.finish().map_err(io::Error::other)
}

/// One-shot decompression of a whole frame sequence.
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder(input).read_to_end(&mut output)?;
    Ok(output)
}

fn frame_info_for_level(level: CompressionLevel) -> FrameInfo {
    let block_size = match level.scaled(1, 5, 9) {
        0..=3 => BlockSize::Max64KB,
        4..=6 => BlockSize::Max256KB,
        7..=8 => BlockSize::Max1MB,
        _ => BlockSize::Max4MB,
    };

    FrameInfo::new()
        .block_mode(BlockMode::Linked)
        .block_size(block_size)
        .content_checksum(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::has_magic;

    #[test]
    fn counted_length_matches_the_sink() {
        let mut encoder = CountingLz4Encoder::with_sink(Vec::new(), CompressionLevel::Default);
        encoder.write_all(b"payload").expect("compress payload");
        let (compressed, bytes) = encoder.finish_into_inner().expect("finish stream");
        assert_eq!(bytes as usize, compressed.len());
        assert!(has_magic(&compressed, MAGIC));
    }

    #[test]
    fn one_shot_helpers_agree() {
        let payload = b"block oriented data";
        let compressed = compress_to_vec(payload, CompressionLevel::Fast).expect("compress");
        assert_eq!(decompress_to_vec(&compressed).expect("decompress"), payload);
    }
}
