use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error returned by identification, extraction, archiving and file system
/// operations.
///
/// Handlers passed to an extraction walk return this type too; whatever they
/// return is propagated unchanged unless the format continues on error.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No registered format recognised the input. An expected outcome, not a
    /// fault.
    #[error("no registered format matched the input")]
    NoMatch,
    /// The governing [`CancelToken`](crate::CancelToken) was raised.
    #[error("operation cancelled")]
    Cancelled,
    /// A file system path was rejected before any I/O took place.
    #[error("{op} {path}: invalid path")]
    InvalidPath {
        /// Operation that received the path.
        op: &'static str,
        /// The rejected path.
        path: String,
    },
    /// The path does not exist inside the archive or directory.
    #[error("{op} {path}: no such file or directory")]
    NotFound {
        /// Operation that looked the path up.
        op: &'static str,
        /// The missing path.
        path: String,
    },
    /// A directory operation was applied to something else.
    #[error("{op} {path}: not a directory")]
    NotADirectory {
        /// Operation that expected a directory.
        op: &'static str,
        /// The offending path.
        path: String,
    },
    /// A codec or container parser reported corrupt input.
    #[error("malformed {format} data: {source}")]
    Malformed {
        /// Canonical name of the format that failed.
        format: String,
        /// Parser error.
        #[source]
        source: io::Error,
    },
    /// The format lacks the requested capability.
    #[error("{format} does not support {operation}")]
    Unsupported {
        /// Canonical name of the format.
        format: String,
        /// Capability that was requested.
        operation: &'static str,
    },
    /// An entry path resolves outside the extraction root.
    #[error("entry {path:?} escapes the extraction root")]
    ZipSlip {
        /// Entry path as stored in the archive.
        path: String,
    },
    /// An entry's content ended before its declared size.
    #[error("entry {path:?} ended before its declared size")]
    WriteAborted {
        /// Entry path being written.
        path: String,
    },
    /// I/O failure tied to a path on the local file system.
    #[error("{}: {source}", .path.display())]
    PathIo {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Plain I/O failure.
    #[error(transparent)]
    Io(io::Error),
    /// Error raised by a caller-supplied handler.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl ArchiveError {
    /// Wraps a parser failure for `format`.
    ///
    /// Failures that already carry an [`ArchiveError`] (such as a cancellation
    /// surfacing through a `Read` implementation) are unwrapped instead, and
    /// failures that are not about the data itself stay plain I/O errors.
    pub fn malformed(format: impl Into<String>, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                if !carries_archive_error(&source) =>
            {
                Self::Malformed {
                    format: format.into(),
                    source,
                }
            }
            _ => source.into(),
        }
    }

    /// Wraps an I/O failure on `path`.
    pub fn path_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PathIo {
            path: path.into(),
            source,
        }
    }

    /// Wraps any error raised inside a handler.
    pub fn other(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Other(error.into())
    }

    /// Returns `true` for [`ArchiveError::NoMatch`].
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    /// Returns `true` for [`ArchiveError::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` when the error means "does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) | Self::PathIo { source: err, .. } => {
                err.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

fn carries_archive_error(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<ArchiveError>())
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        if !carries_archive_error(&err) {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(archive)) => *archive,
            Some(Err(other)) => Self::Io(io::Error::other(other)),
            None => Self::Io(io::Error::other("error payload vanished")),
        }
    }
}

impl From<ArchiveError> for io::Error {
    fn from(err: ArchiveError) -> Self {
        let kind = match err {
            ArchiveError::Io(inner) => return inner,
            ArchiveError::NotFound { .. } => io::ErrorKind::NotFound,
            ArchiveError::InvalidPath { .. } => io::ErrorKind::InvalidInput,
            ArchiveError::Cancelled => io::ErrorKind::Interrupted,
            ArchiveError::Malformed { .. } => io::ErrorKind::InvalidData,
            ArchiveError::WriteAborted { .. } => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::Other,
        };
        Self::new(kind, err)
    }
}
