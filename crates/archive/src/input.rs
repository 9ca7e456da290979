use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Object-safe combination of [`Read`] and [`Seek`].
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Archive bytes handed to an extractor.
///
/// Tar and compressed layers only need a forward stream. Zip and 7z read
/// their central directory first and need random access; a plain stream is
/// buffered into memory for them.
pub enum Input<'a> {
    /// Forward-only byte stream.
    Stream(Box<dyn Read + 'a>),
    /// Random-access source, read from its current position.
    Seekable(Box<dyn ReadSeek + 'a>),
}

impl<'a> Input<'a> {
    /// Wraps a forward-only reader.
    pub fn stream(reader: impl Read + 'a) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Wraps a seekable reader.
    pub fn seekable(reader: impl Read + Seek + 'a) -> Self {
        Self::Seekable(Box::new(reader))
    }

    /// Returns `true` when the input supports random access.
    #[must_use]
    pub const fn is_seekable(&self) -> bool {
        matches!(self, Self::Seekable(_))
    }

    /// Converts the input into a forward stream.
    pub fn into_read(self) -> Box<dyn Read + 'a> {
        match self {
            Self::Stream(reader) => reader,
            Self::Seekable(reader) => Box::new(reader),
        }
    }

    /// Converts the input into a random-access source and reports the number
    /// of bytes available from the current position.
    pub fn into_seekable(self) -> io::Result<(Box<dyn ReadSeek + 'a>, u64)> {
        match self {
            Self::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                let len = data.len() as u64;
                Ok((Box::new(Cursor::new(data)), len))
            }
            Self::Seekable(mut reader) => {
                let start = reader.stream_position()?;
                let end = reader.seek(SeekFrom::End(0))?;
                reader.seek(SeekFrom::Start(start))?;
                Ok((reader, end.saturating_sub(start)))
            }
        }
    }
}

impl std::fmt::Debug for Input<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stream(_) => "Input::Stream",
            Self::Seekable(_) => "Input::Seekable",
        })
    }
}
