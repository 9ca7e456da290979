#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `archive` identifies compressed files and archives from their name and
//! first bytes, walks their members, writes new ones and presents them as a
//! read-only file system.
//!
//! - [`Registry`] holds the known formats in priority order and runs
//!   identification. [`builtin`] is a shared registry with every format
//!   compiled into this build.
//! - [`Extractor::extract`] walks the members of a container, handing each
//!   one to a callback as an [`Entry`].
//! - [`Archiver`] writes containers from [`SourceFile`]s, either from a slice
//!   or from a queue of [`ArchiveJob`]s.
//! - [`ArchiveFs`] makes an archive browsable through the [`FileSystem`]
//!   trait, alongside [`DirFs`] and [`FileFs`].
//!
//! # Design
//!
//! Formats are values. A [`Format`] wraps trait objects for the capabilities
//! it has: a stream codec ([`Compression`]), a container ([`Extractor`], with
//! an optional [`Archiver`]), or a container inside a codec
//! ([`CompressedArchive`]). Codecs are adapters over the `compress` crate;
//! containers delegate parsing to `tar`, `zip` and `sevenz-rust`.
//!
//! Identification probes read a bounded prefix through a [`RewindReader`],
//! which either seeks back or replays what it buffered, so the caller gets
//! the whole stream back afterwards.
//!
//! # Invariants
//!
//! - Archive paths are `/`-separated, relative and normalised; the root is
//!   `"."`.
//! - Every walk checks its [`CancelToken`] before each member.
//! - Nothing is written outside the destination by [`extract_to_dir`].
//!
//! # Errors
//!
//! Every fallible operation returns [`ArchiveError`]. Failing to recognise a
//! stream is the expected [`ArchiveError::NoMatch`], not a fault.
//!
//! # Examples
//!
//! ```
//! use archive::{Archiver, CancelToken, Entry, Extractor, Input, SourceFile, WalkControl, builtin};
//!
//! # fn main() -> Result<(), archive::ArchiveError> {
//! let tar = builtin().lookup(".tar").expect("tar is built in");
//! let mut bytes = Vec::<u8>::new();
//! let files = [SourceFile::from_bytes("hello.txt", &b"hi"[..])];
//! tar.archiver()
//!     .expect("tar is writable")
//!     .archive(&CancelToken::new(), &mut bytes, &files)?;
//!
//! let (format, stream) = builtin().identify("", &bytes[..])?;
//! assert_eq!(format.name(), ".tar");
//!
//! let mut seen = Vec::new();
//! format.extractor().expect("tar extracts").extract(
//!     &CancelToken::new(),
//!     Input::stream(stream),
//!     None,
//!     &mut |entry: &mut Entry<'_>| {
//!         seen.push(entry.path().to_owned());
//!         Ok(WalkControl::Continue)
//!     },
//! )?;
//! assert_eq!(seen, ["hello.txt"]);
//! # Ok(())
//! # }
//! ```

mod cancel;
mod closer;
mod disk;
mod entry;
mod error;
mod format;
pub mod fs;
mod input;
pub mod path;
mod registry;
mod rewind;
mod skip;
mod unpack;
mod walk;

pub use cancel::CancelToken;
pub use closer::{Close, CloseBoth, NoClose, ReadClose};
pub use disk::{FromDiskOptions, files_from_disk};
pub use entry::{DirEntry, Entry, EntryInfo, EntryKind, SourceFile};
pub use error::ArchiveError;
#[cfg(feature = "sevenz")]
pub use format::SevenZip;
pub use format::{
    ArchiveJob, Archiver, Codec, CompressedArchive, Compression, Compressor, Decompressor,
    EntrySink, Extractor, Format, MatchResult, Matcher, Tar, Zip,
};
pub use fs::{ArchiveFs, ArchiveSource, DirFs, File, FileFs, FileSystem, file_system};
pub use input::{Input, ReadSeek};
pub use registry::{Registry, builtin};
pub use rewind::{RewindReader, Rewound, read_prefix};
pub use skip::SkipList;
pub use unpack::extract_to_dir;
pub use walk::{Handler, WalkControl};
