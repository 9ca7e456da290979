//! Enumeration of the stream codecs compiled into this build, with
//! type-erased encoder and decoder constructors.

use core::fmt;
use core::str::FromStr;
use std::io::{self, Read, Write};

use crate::common::StreamEncoder;
use crate::zlib::CompressionLevel;

/// Compression algorithms recognised by the crate.
///
/// Variants for optional codecs only exist when the matching cargo feature is
/// enabled. The declaration order is the order [`CompressionAlgorithm::available`]
/// reports them in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompressionAlgorithm {
    /// Gzip (RFC 1952) members.
    Gzip,
    /// Bzip2 streams.
    #[cfg(feature = "bzip2")]
    Bzip2,
    /// XZ containers around LZMA2.
    #[cfg(feature = "xz")]
    Xz,
    /// Zstandard frames.
    #[cfg(feature = "zstd")]
    Zstd,
    /// LZ4 frames.
    #[cfg(feature = "lz4")]
    Lz4,
    /// Zlib (RFC 1950) streams.
    Zlib,
    /// Brotli streams.
    #[cfg(feature = "brotli")]
    Brotli,
}

impl CompressionAlgorithm {
    /// Returns the canonical lowercase name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => "bzip2",
            #[cfg(feature = "xz")]
            Self::Xz => "xz",
            #[cfg(feature = "zstd")]
            Self::Zstd => "zstd",
            #[cfg(feature = "lz4")]
            Self::Lz4 => "lz4",
            Self::Zlib => "zlib",
            #[cfg(feature = "brotli")]
            Self::Brotli => "brotli",
        }
    }

    /// Returns the conventional file extension, including the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => ".bz2",
            #[cfg(feature = "xz")]
            Self::Xz => ".xz",
            #[cfg(feature = "zstd")]
            Self::Zstd => ".zst",
            #[cfg(feature = "lz4")]
            Self::Lz4 => ".lz4",
            Self::Zlib => ".zz",
            #[cfg(feature = "brotli")]
            Self::Brotli => ".br",
        }
    }

    /// Returns the leading bytes every stream of this codec starts with.
    ///
    /// Brotli has no signature and returns `None`. The zlib signature is a
    /// single byte; use [`crate::zlib::matches_header`] for a stronger check.
    #[must_use]
    pub const fn magic(self) -> Option<&'static [u8]> {
        match self {
            Self::Gzip => Some(crate::gzip::MAGIC),
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => Some(crate::bzip2::MAGIC),
            #[cfg(feature = "xz")]
            Self::Xz => Some(crate::xz::MAGIC),
            #[cfg(feature = "zstd")]
            Self::Zstd => Some(crate::zstd::MAGIC),
            #[cfg(feature = "lz4")]
            Self::Lz4 => Some(crate::lz4::MAGIC),
            Self::Zlib => Some(crate::zlib::MAGIC),
            #[cfg(feature = "brotli")]
            Self::Brotli => None,
        }
    }

    /// Returns `true` when `prefix` begins a stream of this codec.
    ///
    /// Always `false` for codecs without a signature.
    #[must_use]
    pub fn matches_prefix(self, prefix: &[u8]) -> bool {
        match self {
            Self::Zlib => crate::zlib::matches_header(prefix),
            other => other
                .magic()
                .is_some_and(|magic| crate::common::has_magic(prefix, magic)),
        }
    }

    /// Returns every algorithm compiled into the current build.
    #[must_use]
    pub const fn available() -> &'static [CompressionAlgorithm] {
        &[
            Self::Gzip,
            #[cfg(feature = "bzip2")]
            Self::Bzip2,
            #[cfg(feature = "xz")]
            Self::Xz,
            #[cfg(feature = "zstd")]
            Self::Zstd,
            #[cfg(feature = "lz4")]
            Self::Lz4,
            Self::Zlib,
            #[cfg(feature = "brotli")]
            Self::Brotli,
        ]
    }

    /// Wraps `sink` in a streaming encoder for this codec.
    ///
    /// The returned encoder must be finished through
    /// [`StreamEncoder::finish_stream`]; dropping it may leave the stream
    /// without its trailer.
    pub fn encoder<'a>(
        self,
        sink: Box<dyn Write + 'a>,
        level: CompressionLevel,
    ) -> io::Result<Box<dyn StreamEncoder + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(crate::gzip::CountingGzipEncoder::with_sink(sink, level)),
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => Box::new(crate::bzip2::CountingBzip2Encoder::with_sink(sink, level)),
            #[cfg(feature = "xz")]
            Self::Xz => Box::new(crate::xz::CountingXzEncoder::with_sink(sink, level)),
            #[cfg(feature = "zstd")]
            Self::Zstd => Box::new(crate::zstd::CountingZstdEncoder::with_sink(sink, level)?),
            #[cfg(feature = "lz4")]
            Self::Lz4 => Box::new(crate::lz4::CountingLz4Encoder::with_sink(sink, level)),
            Self::Zlib => Box::new(crate::zlib::CountingZlibEncoder::with_sink(sink, level)),
            #[cfg(feature = "brotli")]
            Self::Brotli => Box::new(crate::brotli::CountingBrotliEncoder::with_sink(sink, level)),
        })
    }

    /// Wraps `source` in a decoder for this codec.
    pub fn decoder<'a>(self, source: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(crate::gzip::decoder(source)),
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => Box::new(crate::bzip2::decoder(source)),
            #[cfg(feature = "xz")]
            Self::Xz => Box::new(crate::xz::decoder(source)),
            #[cfg(feature = "zstd")]
            Self::Zstd => Box::new(crate::zstd::decoder(source)?),
            #[cfg(feature = "lz4")]
            Self::Lz4 => Box::new(crate::lz4::decoder(source)),
            Self::Zlib => Box::new(crate::zlib::decoder(source)),
            #[cfg(feature = "brotli")]
            Self::Brotli => Box::new(crate::brotli::decoder(source)),
        })
    }

    /// Compresses `input` into a new [`Vec`].
    pub fn compress_to_vec(self, input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut encoder = self.encoder(Box::new(&mut output), level)?;
        encoder.write_all(input)?;
        encoder.finish_stream()?;
        Ok(output)
    }

    /// Decompresses `input` into a new [`Vec`].
    pub fn decompress_to_vec(self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut output = Vec::new();
        self.decoder(Box::new(input))?.read_to_end(&mut output)?;
        Ok(output)
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown or disabled compression algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompressionAlgorithmParseError {
    input: String,
}

impl CompressionAlgorithmParseError {
    /// Creates a parse error capturing the original input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for CompressionAlgorithmParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported compression algorithm: {}", self.input)
    }
}

impl std::error::Error for CompressionAlgorithmParseError {}

impl FromStr for CompressionAlgorithm {
    type Err = CompressionAlgorithmParseError;

    /// Accepts the canonical name or the extension, with or without its dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let bare = wanted.trim_start_matches('.');
        Self::available()
            .iter()
            .copied()
            .find(|algorithm| {
                algorithm.name() == bare || algorithm.extension().trim_start_matches('.') == bare
            })
            .ok_or_else(|| CompressionAlgorithmParseError::new(s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_algorithms_always_include_deflate_family() {
        let available = CompressionAlgorithm::available();
        assert!(available.contains(&CompressionAlgorithm::Gzip));
        assert!(available.contains(&CompressionAlgorithm::Zlib));
    }

    #[test]
    fn parsing_accepts_names_and_extensions() {
        assert_eq!(
            "gzip".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Gzip
        );
        assert_eq!(
            ".gz".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Gzip
        );
        assert_eq!(
            " ZLIB ".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Zlib
        );
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn parsing_accepts_zstd_extension() {
        assert_eq!(
            "zst".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Zstd
        );
    }

    #[test]
    fn parsing_rejects_unknown_algorithms() {
        let err = "lzip"
            .parse::<CompressionAlgorithm>()
            .expect_err("lzip unsupported");
        assert_eq!(err.input(), "lzip");
    }

    #[test]
    fn extensions_are_unique() {
        let available = CompressionAlgorithm::available();
        for (index, algorithm) in available.iter().enumerate() {
            for other in &available[index + 1..] {
                assert_ne!(algorithm.extension(), other.extension());
            }
        }
    }

    #[test]
    fn every_codec_round_trips_through_trait_objects() {
        let payload = b"type-erased payload, repeated, repeated, repeated";
        for algorithm in CompressionAlgorithm::available() {
            let compressed = algorithm
                .compress_to_vec(payload, CompressionLevel::Default)
                .unwrap_or_else(|err| panic!("{algorithm}: {err}"));
            assert!(
                algorithm.magic().is_none() || algorithm.matches_prefix(&compressed),
                "{algorithm} output lacks its signature"
            );
            let restored = algorithm
                .decompress_to_vec(&compressed)
                .unwrap_or_else(|err| panic!("{algorithm}: {err}"));
            assert_eq!(restored, payload, "{algorithm}");
        }
    }
}
