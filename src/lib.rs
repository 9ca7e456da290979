#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `archives` is the facade of the workspace. It re-exports the [`archive`]
//! crate at the top level and keeps the supporting crates reachable:
//!
//! - [`compress`] holds the single-stream codec adapters.
//! - [`logging`] holds the tracing targets and subscriber setup.
//!
//! # Examples
//!
//! ```
//! use archives::{ArchiveFs, FileSystem, SourceFile, builtin};
//!
//! # fn main() -> Result<(), archives::ArchiveError> {
//! let zip = builtin().lookup(".zip").expect("zip is built in");
//! let mut bytes = Vec::<u8>::new();
//! let files = [SourceFile::from_bytes("docs/readme.txt", &b"hello"[..])];
//! zip.archiver()
//!     .expect("zip is writable")
//!     .archive(&archives::CancelToken::new(), &mut bytes, &files)?;
//!
//! let view = ArchiveFs::from_bytes(bytes, zip)?;
//! let listing = view.read_dir(".")?;
//! assert_eq!(listing[0].name(), "docs");
//! assert!(listing[0].is_implicit());
//! # Ok(())
//! # }
//! ```

pub use archive::*;
pub use compress;
pub use logging;
