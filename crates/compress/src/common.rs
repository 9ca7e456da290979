//! Plumbing shared by every codec module.

use std::io::{self, Write};

/// Encoder that can be finalised through a trait object.
///
/// Codecs emit trailer bytes only when explicitly finished, so callers holding
/// a `Box<dyn StreamEncoder>` must call [`StreamEncoder::finish_stream`]
/// instead of relying on drop.
pub trait StreamEncoder: Write {
    /// Flushes pending input, writes the codec trailer and returns the total
    /// number of compressed bytes handed to the sink.
    fn finish_stream(self: Box<Self>) -> io::Result<u64>;
}

/// Sink that discards all bytes. Used when only the compressed length matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingSink;

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer adapter recording how many bytes pass through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes: u64,
}

impl<W> CountingWriter<W> {
    pub(crate) const fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) const fn bytes(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn into_parts(self) -> (W, u64) {
        (self.inner, self.bytes)
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Returns `true` when `data` starts with the complete `magic` sequence.
///
/// A truncated prefix never matches, even when every byte present agrees.
#[must_use]
pub fn has_magic(data: &[u8], magic: &[u8]) -> bool {
    data.len() >= magic.len() && &data[..magic.len()] == magic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_writer_tracks_forwarded_bytes() {
        let mut writer = CountingWriter::new(Vec::new());
        writer.write_all(b"abc").expect("write");
        writer.write_all(b"de").expect("write");
        let (inner, bytes) = writer.into_parts();
        assert_eq!(inner, b"abcde");
        assert_eq!(bytes, 5);
    }

    #[test]
    fn truncated_magic_does_not_match() {
        let xz = [0xFD, b'7', b'z', b'X', b'Z', 0x00];
        assert!(has_magic(&xz, &xz));
        assert!(!has_magic(&xz[..5], &xz));
        assert!(!has_magic(&[], &xz));
    }
}
