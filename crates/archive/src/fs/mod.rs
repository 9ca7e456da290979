//! Read-only file system views over archives, directories and single files.
//!
//! # Overview
//!
//! [`FileSystem`] is the small capability surface shared by every view:
//! `open`, `stat`, `read_dir` and `sub`, all taking `/`-separated relative
//! names that satisfy [`valid_path`](crate::path::valid_path).
//!
//! - [`ArchiveFs`] presents the members of an archive as a directory tree,
//!   synthesising directories that were never stored.
//! - [`DirFs`] is a plain directory on disk.
//! - [`FileFs`] presents one file, decompressed when it uses a known codec.
//!
//! [`file_system`] picks the right view for a path on disk.

mod archive;
mod dir;
mod file;
mod index;
mod stream;

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

pub use self::archive::{ArchiveFs, ArchiveSource};
pub use self::dir::DirFs;
pub use self::file::FileFs;

use crate::closer::{Close, ReadClose};
use crate::entry::{DirEntry, EntryInfo};
use crate::error::ArchiveError;
use crate::format::Format;
use crate::registry::Registry;

/// Read-only hierarchical file system.
pub trait FileSystem: Send + Sync {
    /// Opens a file for reading or a directory for listing.
    fn open(&self, name: &str) -> Result<File, ArchiveError>;

    /// Returns metadata without opening content.
    fn stat(&self, name: &str) -> Result<EntryInfo, ArchiveError>;

    /// Lists a directory sorted by name.
    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>, ArchiveError>;

    /// Returns a view rooted at directory `dir`.
    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>, ArchiveError>;
}

/// An open file or directory.
///
/// Files are read through [`Read`]; directories are listed with
/// [`File::read_dir`]. Closing happens on drop, or explicitly through
/// [`File::close`] to observe errors.
pub struct File {
    info: EntryInfo,
    body: Body,
}

enum Body {
    Dir { entries: Vec<DirEntry>, offset: usize },
    Stream(Box<dyn ReadClose>),
    Closed,
}

impl File {
    pub(crate) fn directory(info: EntryInfo, entries: Vec<DirEntry>) -> Self {
        Self {
            info,
            body: Body::Dir {
                entries,
                offset: 0,
            },
        }
    }

    pub(crate) fn stream(info: EntryInfo, stream: impl ReadClose + 'static) -> Self {
        Self {
            info,
            body: Body::Stream(Box::new(stream)),
        }
    }

    /// Metadata of the opened entry.
    #[must_use]
    pub const fn info(&self) -> &EntryInfo {
        &self.info
    }

    /// Returns the next directory entries.
    ///
    /// With `Some(n)` at most `n` entries are returned and an empty result
    /// means the listing is exhausted. `None` returns everything not yet
    /// returned.
    pub fn read_dir(&mut self, limit: Option<usize>) -> Result<Vec<DirEntry>, ArchiveError> {
        let Body::Dir { entries, offset } = &mut self.body else {
            return Err(ArchiveError::NotADirectory {
                op: "readdir",
                path: self.info.path().to_owned(),
            });
        };
        let end = limit.map_or(entries.len(), |n| (*offset + n).min(entries.len()));
        let batch = entries[*offset..end].to_vec();
        *offset = end;
        Ok(batch)
    }

    /// Closes the file, reporting the first error from any layer.
    pub fn close(mut self) -> Result<(), ArchiveError> {
        self.close_body().map_err(ArchiveError::from)
    }

    fn close_body(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.body, Body::Closed) {
            Body::Stream(mut stream) => stream.close(),
            Body::Dir { .. } | Body::Closed => Ok(()),
        }
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.body {
            Body::Stream(stream) => stream.read(buf),
            Body::Dir { .. } => Err(io::Error::other(format!(
                "{}: is a directory",
                self.info.path()
            ))),
            Body::Closed => Err(io::Error::other("read from a closed file")),
        }
    }
}

impl Drop for File {
    fn drop(&mut self) {
        let _ = self.close_body();
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File").field("info", &self.info).finish_non_exhaustive()
    }
}

/// Chooses a view for `path`: [`DirFs`] for a directory, [`ArchiveFs`] for a
/// recognised archive, otherwise [`FileFs`], decompressing when the file uses
/// a registered codec.
pub fn file_system(registry: &Registry, path: impl AsRef<Path>) -> Result<Box<dyn FileSystem>, ArchiveError> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|err| ArchiveError::path_io(path, err))?;
    if metadata.is_dir() {
        return Ok(Box::new(DirFs::new(path)));
    }
    let mut file = std::fs::File::open(path).map_err(|err| ArchiveError::path_io(path, err))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match registry.identify_seekable(&filename, &mut file) {
        Ok(Format::Compression(codec)) => Ok(Box::new(FileFs::new(path, Some(codec)))),
        Ok(format) => Ok(Box::new(ArchiveFs::new(
            ArchiveSource::Path(path.to_path_buf()),
            &format,
        )?)),
        Err(ArchiveError::NoMatch) => Ok(Box::new(FileFs::new(path, None))),
        Err(err) => Err(err),
    }
}

/// Retries `op` with the first path element removed when `name` fails as
/// given.
fn without_top_dir<T>(
    name: &str,
    mut op: impl FnMut(&str) -> Result<T, ArchiveError>,
) -> Result<T, ArchiveError> {
    match op(name) {
        Ok(found) => Ok(found),
        Err(err) => match crate::path::strip_first_component(name) {
            Some(rest) => op(rest),
            None => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_handles_page_through_entries() {
        let entries = ["a", "b", "c"]
            .iter()
            .map(|name| DirEntry::new(EntryInfo::file(name, 0), false))
            .collect();
        let mut dir = File::directory(EntryInfo::dir("."), entries);
        assert_eq!(dir.read_dir(Some(2)).expect("page").len(), 2);
        assert_eq!(dir.read_dir(None).expect("rest").len(), 1);
        assert!(dir.read_dir(Some(2)).expect("done").is_empty());
        assert!(dir.read(&mut [0u8; 4]).is_err());
    }

    #[test]
    fn files_refuse_listing() {
        let mut file = File::stream(
            EntryInfo::file("a.txt", 3),
            crate::closer::NoClose(&b"abc"[..]),
        );
        assert!(matches!(
            file.read_dir(None),
            Err(ArchiveError::NotADirectory { .. })
        ));
        let mut text = String::new();
        file.read_to_string(&mut text).expect("read");
        assert_eq!(text, "abc");
        file.close().expect("close");
    }

    #[test]
    fn top_dir_retry_strips_one_element() {
        let mut tried = Vec::new();
        let found = without_top_dir("top/a/b", |name| {
            tried.push(name.to_owned());
            if name == "a/b" {
                Ok(())
            } else {
                Err(ArchiveError::NotFound {
                    op: "open",
                    path: name.to_owned(),
                })
            }
        });
        assert!(found.is_ok());
        assert_eq!(tried, ["top/a/b", "a/b"]);
        assert!(without_top_dir("single", |_| Err::<(), _>(ArchiveError::NoMatch)).is_err());
    }
}
