use std::io::{self, Read, Write};

use compress::{CompressionAlgorithm, CompressionLevel, StreamEncoder};

use super::{Compressor, Decompressor, MatchResult, Matcher, name_matches, probe_stream};
use crate::rewind::read_prefix;

/// A single-stream compression format backed by the `compress` crate.
///
/// The format name is the codec's extension (`.gz`, `.zst`, ...). Codecs
/// without a header, such as brotli, only ever match by name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Codec {
    algorithm: CompressionAlgorithm,
    level: CompressionLevel,
}

impl Codec {
    /// Codec writing at the default level.
    #[must_use]
    pub const fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            level: CompressionLevel::Default,
        }
    }

    /// Sets the level used by [`Compressor::open_writer`].
    #[must_use]
    pub const fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Underlying algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Level used when compressing.
    #[must_use]
    pub const fn level(&self) -> CompressionLevel {
        self.level
    }
}

impl Matcher for Codec {
    fn name(&self) -> &str {
        self.algorithm.extension()
    }

    fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult> {
        let by_name = name_matches(filename, self.name());
        let by_stream = match self.algorithm.magic() {
            // zlib checks two header bytes even though its magic is one.
            Some(magic) => probe_stream(stream, |stream| {
                let prefix = read_prefix(stream, magic.len().max(2))?;
                Ok(self.algorithm.matches_prefix(&prefix))
            })?,
            None => false,
        };
        Ok(MatchResult { by_name, by_stream })
    }
}

impl Compressor for Codec {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn StreamEncoder + 'w>> {
        self.algorithm.encoder(sink, self.level)
    }
}

impl Decompressor for Codec {
    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        self.algorithm.decoder(source)
    }
}
