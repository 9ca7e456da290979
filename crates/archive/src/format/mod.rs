//! Format capabilities and the [`Format`] value returned by identification.
//!
//! A format is described by the subset of capability traits it implements:
//! every format is a [`Matcher`]; stream codecs are [`Compression`]s;
//! containers are [`Extractor`]s, and those that can also be written expose an
//! [`Archiver`].

pub(crate) mod codec;
pub(crate) mod composite;
#[cfg(feature = "sevenz")]
pub(crate) mod sevenz;
pub(crate) mod tar;
pub(crate) mod zip;

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use compress::StreamEncoder;
use crossbeam_channel::{Receiver, Sender, bounded};
use logging::trace_archive;

use crate::cancel::CancelToken;
use crate::entry::SourceFile;
use crate::error::ArchiveError;
use crate::input::Input;
use crate::walk::Handler;

pub use self::codec::Codec;
pub use self::composite::CompressedArchive;
#[cfg(feature = "sevenz")]
pub use self::sevenz::SevenZip;
pub use self::tar::Tar;
pub use self::zip::Zip;

/// Outcome of probing a format against a file name and stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MatchResult {
    /// The file name carries the format's extension.
    pub by_name: bool,
    /// The stream starts with the format's header.
    pub by_stream: bool,
}

impl MatchResult {
    /// Returns `true` when either heuristic matched.
    #[must_use]
    pub const fn matched(self) -> bool {
        self.by_name || self.by_stream
    }
}

/// Recognises a format from a file name and the first bytes of a stream.
pub trait Matcher: Send + Sync {
    /// Canonical name, which is also the conventional extension (`.tar.gz`).
    fn name(&self) -> &str;

    /// Probes `filename` and, when present, the stream.
    ///
    /// Implementations read only as much as their header needs. A stream that
    /// ends early simply does not match.
    fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult>;
}

/// Wraps a writer in a compressing encoder.
pub trait Compressor: Matcher {
    /// Returns an encoder writing compressed bytes to `sink`. The encoder must
    /// be finished with [`StreamEncoder::finish_stream`].
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn StreamEncoder + 'w>>;
}

/// Wraps a reader in a decoder.
pub trait Decompressor: Matcher {
    /// Returns a reader yielding the decompressed content of `source`.
    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>>;
}

/// A stream codec that both compresses and decompresses.
pub trait Compression: Compressor + Decompressor {}

impl<T: Compressor + Decompressor> Compression for T {}

/// Walks the members of a container.
pub trait Extractor: Matcher {
    /// Visits the members of `input` in archive order.
    ///
    /// `paths` filters members as described by
    /// [`path_included`](crate::path::path_included). The walk stops at the
    /// first error returned by `handler` unless the format continues on
    /// error; cancellation always stops it.
    fn extract(
        &self,
        cancel: &CancelToken,
        input: Input<'_>,
        paths: Option<&[String]>,
        handler: &mut Handler<'_>,
    ) -> Result<(), ArchiveError>;

    /// Returns the writing side of the format, when it has one.
    fn archiver(&self) -> Option<&dyn Archiver> {
        None
    }
}

/// Receives members while an archive is being written.
pub trait EntrySink {
    /// Appends one member, reading its content to the end.
    fn add(&mut self, file: &SourceFile) -> Result<(), ArchiveError>;
}

/// Writes new archives.
pub trait Archiver: Send + Sync {
    /// Opens an archive on `output`, lets `feed` add members, then writes the
    /// trailer. The trailer is written even when `feed` fails; the first error
    /// is returned.
    fn archive_with(
        &self,
        cancel: &CancelToken,
        output: &mut dyn Write,
        feed: &mut dyn FnMut(&mut dyn EntrySink) -> Result<(), ArchiveError>,
    ) -> Result<(), ArchiveError>;

    /// Writes `files` in order.
    fn archive(
        &self,
        cancel: &CancelToken,
        output: &mut dyn Write,
        files: &[SourceFile],
    ) -> Result<(), ArchiveError> {
        self.archive_with(cancel, output, &mut |sink| {
            for file in files {
                cancel.check()?;
                sink.add(file)?;
            }
            Ok(())
        })
    }

    /// Writes members received over `jobs` until every sender is dropped.
    ///
    /// Each job's outcome is sent back over its reply channel and a failed
    /// member does not end the archive. Cancellation replies
    /// [`ArchiveError::Cancelled`] to the pending job and ends the archive
    /// with the same error.
    fn archive_async(
        &self,
        cancel: &CancelToken,
        output: &mut dyn Write,
        jobs: &Receiver<ArchiveJob>,
    ) -> Result<(), ArchiveError> {
        self.archive_with(cancel, output, &mut |sink| {
            for job in jobs {
                if cancel.is_cancelled() {
                    job.respond(Err(ArchiveError::Cancelled));
                    return Err(ArchiveError::Cancelled);
                }
                let outcome = sink.add(&job.file);
                if let Err(err) = &outcome {
                    trace_archive!(warn, path = job.file.info().path(), error = %err, "member failed");
                }
                job.respond(outcome);
            }
            Ok(())
        })
    }
}

/// One member queued for [`Archiver::archive_async`].
#[derive(Debug)]
pub struct ArchiveJob {
    file: SourceFile,
    reply: Sender<Result<(), ArchiveError>>,
}

impl ArchiveJob {
    /// Creates a job and the receiver its outcome will arrive on.
    pub fn new(file: SourceFile) -> (Self, Receiver<Result<(), ArchiveError>>) {
        let (reply, outcome) = bounded(1);
        (Self { file, reply }, outcome)
    }

    /// Member to be written.
    #[must_use]
    pub const fn file(&self) -> &SourceFile {
        &self.file
    }

    fn respond(self, outcome: Result<(), ArchiveError>) {
        // The submitter may have stopped waiting.
        let _ = self.reply.send(outcome);
    }
}

/// A registered format.
///
/// Cloning is cheap: the variants hold shared trait objects.
#[derive(Clone)]
pub enum Format {
    /// A stream codec such as `.gz`.
    Compression(Arc<dyn Compression>),
    /// A container such as `.tar` or `.zip`.
    Archive(Arc<dyn Extractor>),
    /// A container inside a stream codec such as `.tar.gz`.
    CompressedArchive(Arc<CompressedArchive>),
}

impl Format {
    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Compression(codec) => codec.name(),
            Self::Archive(extractor) => extractor.name(),
            Self::CompressedArchive(composite) => composite.name(),
        }
    }

    /// Delegates to the underlying [`Matcher`].
    pub fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult> {
        match self {
            Self::Compression(codec) => codec.matches(filename, stream),
            Self::Archive(extractor) => extractor.matches(filename, stream),
            Self::CompressedArchive(composite) => composite.matches(filename, stream),
        }
    }

    /// Returns the codec of a compression format.
    #[must_use]
    pub fn as_compression(&self) -> Option<&Arc<dyn Compression>> {
        match self {
            Self::Compression(codec) => Some(codec),
            _ => None,
        }
    }

    /// Returns the extractor of an archive or compressed archive.
    #[must_use]
    pub fn extractor(&self) -> Option<Arc<dyn Extractor>> {
        match self {
            Self::Compression(_) => None,
            Self::Archive(extractor) => Some(Arc::clone(extractor)),
            Self::CompressedArchive(composite) => {
                Some(Arc::clone(composite) as Arc<dyn Extractor>)
            }
        }
    }

    /// Returns the writing side of an archive format.
    #[must_use]
    pub fn archiver(&self) -> Option<&dyn Archiver> {
        match self {
            Self::Compression(_) => None,
            Self::Archive(extractor) => extractor.archiver(),
            Self::CompressedArchive(composite) => composite.archiver(),
        }
    }

    /// Returns `true` for formats holding multiple members.
    #[must_use]
    pub const fn is_archive(&self) -> bool {
        !matches!(self, Self::Compression(_))
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Compression(_) => "Compression",
            Self::Archive(_) => "Archive",
            Self::CompressedArchive(_) => "CompressedArchive",
        };
        f.debug_tuple(kind).field(&self.name()).finish()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case-insensitive check that `filename` mentions `extension`.
///
/// Names such as `backup.tar.gz.part` still hint at `.gz`.
pub(crate) fn name_matches(filename: &str, extension: &str) -> bool {
    !filename.is_empty()
        && filename
            .to_ascii_lowercase()
            .contains(&extension.to_ascii_lowercase())
}

/// Runs a stream probe, treating a stream that ends early or fails to decode
/// as "no match".
pub(crate) fn probe_stream(
    stream: Option<&mut dyn Read>,
    probe: impl FnOnce(&mut dyn Read) -> io::Result<bool>,
) -> io::Result<bool> {
    let Some(stream) = stream else {
        return Ok(false);
    };
    match probe(stream) {
        Ok(matched) => Ok(matched),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Maps a member content failure while writing.
pub(crate) fn content_error(path: &str, err: io::Error) -> ArchiveError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ArchiveError::WriteAborted {
            path: path.to_owned(),
        }
    } else {
        ArchiveError::from(err)
    }
}
