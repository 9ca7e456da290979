//! Replayable input for format probing.
//!
//! Identification reads a few bytes per candidate format and must hand the
//! caller a stream that still starts at the very first byte. Seekable sources
//! are rewound with a seek; anything else is recorded while it is read and
//! replayed from memory.

use std::io::{self, Chain, Cursor, Read, Seek, SeekFrom};

/// Reader that can return to its starting position until it is consumed with
/// [`into_reader`](Self::into_reader).
pub struct RewindReader<R> {
    inner: R,
    mode: Mode<R>,
}

enum Mode<R> {
    Seek {
        start: u64,
        seek: fn(&mut R, u64) -> io::Result<u64>,
    },
    Buffer {
        buf: Vec<u8>,
        pos: usize,
    },
}

impl<R: Read> RewindReader<R> {
    /// Wraps a non-seekable reader. Every byte read is retained until
    /// [`into_reader`](Self::into_reader) is called.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            mode: Mode::Buffer {
                buf: Vec::new(),
                pos: 0,
            },
        }
    }

    /// Moves the read cursor back to where the reader started.
    pub fn rewind(&mut self) -> io::Result<()> {
        match &mut self.mode {
            Mode::Seek { start, seek } => {
                seek(&mut self.inner, *start)?;
            }
            Mode::Buffer { pos, .. } => *pos = 0,
        }
        Ok(())
    }

    /// Returns `true` when rewinding seeks instead of replaying a buffer.
    pub fn is_seekable(&self) -> bool {
        matches!(self.mode, Mode::Seek { .. })
    }

    /// Number of bytes retained for replay.
    pub fn buffered(&self) -> usize {
        match &self.mode {
            Mode::Seek { .. } => 0,
            Mode::Buffer { buf, .. } => buf.len(),
        }
    }

    /// Consumes the wrapper, returning a reader positioned where this one
    /// currently is. Buffered bytes not yet re-read are replayed first; the
    /// result never buffers again.
    pub fn into_reader(self) -> Rewound<R> {
        match self.mode {
            Mode::Seek { .. } => Rewound::Direct(self.inner),
            Mode::Buffer { mut buf, pos } => {
                if pos >= buf.len() {
                    return Rewound::Direct(self.inner);
                }
                buf.drain(..pos);
                Rewound::Replay(Cursor::new(buf).chain(self.inner))
            }
        }
    }
}

impl<R: Read + Seek> RewindReader<R> {
    /// Wraps a seekable reader, recording its current position as the start.
    pub fn seekable(mut inner: R) -> io::Result<Self> {
        let start = inner.stream_position()?;
        Ok(Self {
            inner,
            mode: Mode::Seek {
                start,
                seek: seek_to::<R>,
            },
        })
    }
}

fn seek_to<R: Seek>(reader: &mut R, offset: u64) -> io::Result<u64> {
    reader.seek(SeekFrom::Start(offset))
}

impl<R: Read> Read for RewindReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        match &mut self.mode {
            Mode::Seek { .. } => self.inner.read(out),
            Mode::Buffer { buf, pos } => {
                if *pos < buf.len() {
                    let n = (buf.len() - *pos).min(out.len());
                    out[..n].copy_from_slice(&buf[*pos..*pos + n]);
                    *pos += n;
                    return Ok(n);
                }
                let n = self.inner.read(out)?;
                buf.extend_from_slice(&out[..n]);
                *pos += n;
                Ok(n)
            }
        }
    }
}

/// Reader returned by [`RewindReader::into_reader`].
#[derive(Debug)]
pub enum Rewound<R> {
    /// The original reader, positioned at the rewound start.
    Direct(R),
    /// Unread buffered bytes followed by the rest of the original reader.
    Replay(Chain<Cursor<Vec<u8>>, R>),
}

impl<R> Rewound<R> {
    /// Returns the underlying reader when nothing remains to be replayed.
    pub fn into_direct(self) -> Result<R, Self> {
        match self {
            Self::Direct(inner) => Ok(inner),
            replay @ Self::Replay(_) => Err(replay),
        }
    }
}

impl<R: Read> Read for Rewound<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Direct(inner) => inner.read(out),
            Self::Replay(chain) => chain.read(out),
        }
    }
}

/// Reads up to `len` bytes, stopping early at end of input.
///
/// A short result is not an error: probing a stream smaller than a format's
/// header simply yields fewer bytes.
pub fn read_prefix<R: Read + ?Sized>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(len);
    Read::take(reader, len as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}
