//! Registered formats and two-layer identification.
//!
//! Identification runs two passes over a [`RewindReader`]. The compression
//! pass probes every codec against the raw bytes. The archive pass probes
//! every container, reading through the chosen codec's decoder when one was
//! found. The stream is rewound before and after every probe.
//!
//! Within a pass the first format in registration order whose stream probe
//! matches wins. File names are a hint only: they are consulted when there
//! is no stream, or when no codec and no container recognises its bytes.

use std::collections::HashMap;
use std::io::{self, Read, Seek};
use std::sync::{Arc, OnceLock};

use compress::CompressionAlgorithm;
use logging::trace_identify;

use crate::error::ArchiveError;
use crate::format::{Codec, CompressedArchive, Compression, Format, MatchResult, Tar, Zip};
use crate::rewind::{RewindReader, Rewound};

/// An ordered, name-keyed set of formats.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    formats: Vec<Format>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every format compiled into this build:
    /// the codecs in [`CompressionAlgorithm::available`] order, then `.zip`,
    /// `.7z` and `.tar`.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for &algorithm in CompressionAlgorithm::available() {
            registry.register(Format::Compression(Arc::new(Codec::new(algorithm))));
        }
        registry.register(Format::Archive(Arc::new(Zip::new())));
        #[cfg(feature = "sevenz")]
        registry.register(Format::Archive(Arc::new(crate::format::SevenZip::new())));
        registry.register(Format::Archive(Arc::new(Tar::new())));
        registry
    }

    /// Adds `format` after every format registered so far.
    ///
    /// # Panics
    ///
    /// Registering two formats with the same name is a programming error and
    /// panics.
    pub fn register(&mut self, format: Format) {
        let name = format.name().to_owned();
        assert!(
            !self.by_name.contains_key(&name),
            "format {name} registered twice"
        );
        self.by_name.insert(name, self.formats.len());
        self.formats.push(format);
    }

    /// Finds a format by its canonical name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Format> {
        self.by_name.get(name).map(|&index| &self.formats[index])
    }

    /// Formats in registration order.
    #[must_use]
    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    /// Identifies a format from its file name alone.
    pub fn identify_name(&self, filename: &str) -> Result<Format, ArchiveError> {
        self.identify_rewind::<io::Empty>(filename, None)
    }

    /// Identifies `stream`, returning the format and a reader that yields the
    /// stream from its first byte.
    pub fn identify<R: Read>(
        &self,
        filename: &str,
        stream: R,
    ) -> Result<(Format, Rewound<R>), ArchiveError> {
        let mut replay = RewindReader::new(stream);
        let format = self.identify_rewind(filename, Some(&mut replay))?;
        Ok((format, replay.into_reader()))
    }

    /// Identifies a seekable stream, leaving it at the position it started
    /// at. Nothing is buffered.
    pub fn identify_seekable<R: Read + Seek>(
        &self,
        filename: &str,
        stream: &mut R,
    ) -> Result<Format, ArchiveError> {
        let mut rewind = RewindReader::seekable(stream)?;
        self.identify_rewind(filename, Some(&mut rewind))
    }

    /// Identifies a format through a caller-owned [`RewindReader`].
    ///
    /// The reader is left rewound whatever the outcome, so it can be probed
    /// again or consumed after [`ArchiveError::NoMatch`]. Without a reader,
    /// or when no format recognises its bytes, the file name decides.
    pub fn identify_rewind<R: Read>(
        &self,
        filename: &str,
        stream: Option<&mut RewindReader<R>>,
    ) -> Result<Format, ArchiveError> {
        let filename = if filename == "." { "" } else { filename };
        let Some(stream) = stream else {
            return self.identify_by_name(filename);
        };

        let mut outer = None;
        for codec in self.codecs() {
            let result = probe(stream, |stream| codec.matches(filename, stream))?;
            if result.by_stream {
                outer = Some(codec);
                break;
            }
        }

        let mut inner = None;
        for format in self.formats.iter().filter(|format| format.is_archive()) {
            let by_stream = match outer {
                Some(codec) => probe_decoded(stream, codec, format)?,
                None => probe(stream, |stream| format.matches(filename, stream))?.by_stream,
            };
            if by_stream {
                inner = Some(format);
                break;
            }
        }

        let Some(identified) = layered(outer, inner) else {
            trace_identify!(trace, filename, "no stream signature, trying the name");
            return self.identify_by_name(filename);
        };
        trace_identify!(debug, filename, format = identified.name(), "identified");
        Ok(identified)
    }

    fn identify_by_name(&self, filename: &str) -> Result<Format, ArchiveError> {
        let mut outer = None;
        for codec in self.codecs() {
            if codec.matches(filename, None)?.by_name {
                outer = Some(codec);
                break;
            }
        }
        let mut inner = None;
        for format in self.formats.iter().filter(|format| format.is_archive()) {
            if format.matches(filename, None)?.by_name {
                inner = Some(format);
                break;
            }
        }

        let Some(identified) = layered(outer, inner) else {
            trace_identify!(debug, filename, "no format matched");
            return Err(ArchiveError::NoMatch);
        };
        trace_identify!(debug, filename, format = identified.name(), "identified by name");
        Ok(identified)
    }

    fn codecs(&self) -> impl Iterator<Item = &Arc<dyn Compression>> {
        self.formats.iter().filter_map(|format| match format {
            Format::Compression(codec) => Some(codec),
            _ => None,
        })
    }
}

/// Combines the codec and container chosen by the two passes.
fn layered(outer: Option<&Arc<dyn Compression>>, inner: Option<&Format>) -> Option<Format> {
    match (outer, inner) {
        (Some(codec), Some(format)) => Some(match format.extractor() {
            Some(extractor) => Format::CompressedArchive(Arc::new(CompressedArchive::new(
                Arc::clone(codec),
                extractor,
            ))),
            None => Format::Compression(Arc::clone(codec)),
        }),
        (Some(codec), None) => Some(Format::Compression(Arc::clone(codec))),
        (None, Some(format)) => Some(format.clone()),
        (None, None) => None,
    }
}

/// Returns the shared registry of built-in formats, building it on first
/// use.
pub fn builtin() -> &'static Registry {
    static BUILTIN: OnceLock<Registry> = OnceLock::new();
    BUILTIN.get_or_init(Registry::with_builtin)
}

/// Runs one probe with the stream rewound on both sides.
fn probe<R: Read>(
    stream: &mut RewindReader<R>,
    run: impl FnOnce(Option<&mut dyn Read>) -> io::Result<MatchResult>,
) -> Result<MatchResult, ArchiveError> {
    stream.rewind()?;
    let result = run(Some(&mut *stream));
    stream.rewind()?;
    Ok(result?)
}

/// Probes a container against the output of `codec`.
///
/// A stream that fails to decode does not match.
fn probe_decoded<R: Read>(
    stream: &mut RewindReader<R>,
    codec: &Arc<dyn Compression>,
    format: &Format,
) -> Result<bool, ArchiveError> {
    stream.rewind()?;
    let by_stream = match codec.open_reader(Box::new(&mut *stream)) {
        Ok(mut decoded) => format
            .matches("", Some(&mut *decoded))
            .is_ok_and(|result| result.by_stream),
        Err(_) => false,
    };
    stream.rewind()?;
    Ok(by_stream)
}
