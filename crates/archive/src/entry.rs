//! Metadata and content handles for archive members.

use std::fmt;
use std::fs::Metadata;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::path::{base, normalize};

/// What an archive member is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntryKind {
    /// Regular file with content.
    File,
    /// Directory.
    Dir,
    /// Symbolic link; the target is in [`EntryInfo::link_target`].
    Symlink,
    /// Hard link to another member named by [`EntryInfo::link_target`].
    Hardlink,
}

/// Metadata of one archive member.
///
/// Paths are normalised on construction: `./a//b/` becomes `a/b` and an
/// empty path becomes `"."`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryInfo {
    path: String,
    size: u64,
    mode: u32,
    modified: Option<SystemTime>,
    kind: EntryKind,
    link_target: Option<String>,
}

impl EntryInfo {
    /// Creates metadata with the conventional default mode for `kind`.
    pub fn new(path: &str, kind: EntryKind) -> Self {
        let mode = match kind {
            EntryKind::File | EntryKind::Hardlink => 0o644,
            EntryKind::Dir => 0o755,
            EntryKind::Symlink => 0o777,
        };
        Self {
            path: normalize(path),
            size: 0,
            mode,
            modified: None,
            kind,
            link_target: None,
        }
    }

    /// Regular file of `size` bytes.
    pub fn file(path: &str, size: u64) -> Self {
        Self::new(path, EntryKind::File).with_size(size)
    }

    /// Directory.
    pub fn dir(path: &str) -> Self {
        Self::new(path, EntryKind::Dir)
    }

    /// Directory synthesised from the paths of its descendants.
    pub(crate) fn implicit_dir(path: &str) -> Self {
        Self::dir(path)
    }

    /// Builds metadata for a file found on disk.
    pub fn from_metadata(path: &str, metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::File
        };
        let mut info = Self::new(path, kind).with_mode(disk_mode(metadata, kind));
        if kind == EntryKind::File {
            info.size = metadata.len();
        }
        info.modified = metadata.modified().ok();
        info
    }

    /// Sets the content size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Sets the permission bits. File type bits are discarded.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode & 0o7777;
        self
    }

    /// Sets the modification time.
    pub fn with_modified(mut self, modified: impl Into<Option<SystemTime>>) -> Self {
        self.modified = modified.into();
        self
    }

    /// Sets the link target of a symlink or hard link.
    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    /// Normalised archive path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last element of the path.
    #[must_use]
    pub fn name(&self) -> &str {
        base(&self.path)
    }

    /// Content size in bytes; zero for directories and links.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Permission bits.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Modification time, when the format records one.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Member kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Link target for symlinks and hard links.
    #[must_use]
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }

    /// Returns `true` for directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Returns `true` for regular files.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Returns `true` for symbolic links.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

#[cfg(unix)]
fn disk_mode(metadata: &Metadata, _kind: EntryKind) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn disk_mode(metadata: &Metadata, kind: EntryKind) -> u32 {
    let mode = EntryInfo::new(".", kind).mode();
    if metadata.permissions().readonly() {
        mode & !0o222
    } else {
        mode
    }
}

/// One archive member during a walk.
///
/// The content reader borrows the archive stream and is only valid inside the
/// handler call that received the entry.
pub struct Entry<'a> {
    info: EntryInfo,
    reader: &'a mut dyn Read,
}

impl<'a> Entry<'a> {
    /// Pairs metadata with the member's content.
    pub fn new(info: EntryInfo, reader: &'a mut dyn Read) -> Self {
        Self { info, reader }
    }

    /// Member metadata.
    #[must_use]
    pub const fn info(&self) -> &EntryInfo {
        &self.info
    }

    /// Shorthand for `info().path()`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.info.path()
    }

    /// Shorthand for `info().is_dir()`.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }
}

impl Read for Entry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("info", &self.info).finish_non_exhaustive()
    }
}

/// One child in a directory listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirEntry {
    name: String,
    info: EntryInfo,
    implicit: bool,
}

impl DirEntry {
    pub(crate) fn new(info: EntryInfo, implicit: bool) -> Self {
        Self {
            name: info.name().to_owned(),
            info,
            implicit,
        }
    }

    /// Base name of the child.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child metadata.
    #[must_use]
    pub const fn info(&self) -> &EntryInfo {
        &self.info
    }

    /// Returns `true` when the directory was never stored in the archive and
    /// was inferred from its descendants.
    #[must_use]
    pub const fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Shorthand for `info().is_dir()`.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }
}

type Opener = Arc<dyn Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync>;

/// A member to be written into a new archive.
#[derive(Clone)]
pub struct SourceFile {
    info: EntryInfo,
    opener: Option<Opener>,
}

impl SourceFile {
    /// In-memory regular file.
    pub fn from_bytes(path: &str, data: impl Into<Arc<[u8]>>) -> Self {
        let data: Arc<[u8]> = data.into();
        let info = EntryInfo::file(path, data.len() as u64);
        Self::with_opener(info, move || Ok(Box::new(Cursor::new(Arc::clone(&data)))))
    }

    /// Directory entry.
    pub fn directory(path: &str) -> Self {
        Self {
            info: EntryInfo::dir(path),
            opener: None,
        }
    }

    /// Symbolic link pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            info: EntryInfo::new(path, EntryKind::Symlink).with_link_target(target),
            opener: None,
        }
    }

    /// Member read lazily from `disk_path` when the archive is written.
    pub fn from_disk(info: EntryInfo, disk_path: impl Into<PathBuf>) -> Self {
        if !info.is_file() {
            return Self { info, opener: None };
        }
        let disk_path: PathBuf = disk_path.into();
        Self::with_opener(info, move || open_disk(&disk_path))
    }

    /// Member whose content comes from `opener`.
    pub fn with_opener(
        info: EntryInfo,
        opener: impl Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            info,
            opener: Some(Arc::new(opener)),
        }
    }

    /// Member metadata.
    #[must_use]
    pub const fn info(&self) -> &EntryInfo {
        &self.info
    }

    /// Opens the member's content. Non-files yield an empty stream.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match &self.opener {
            Some(opener) => opener(),
            None => Ok(Box::new(io::empty())),
        }
    }
}

fn open_disk(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    Ok(Box::new(std::fs::File::open(path)?))
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("info", &self.info)
            .field("has_content", &self.opener.is_some())
            .finish()
    }
}

/// Reader that yields exactly `remaining` bytes and fails if its source ends
/// early. Longer sources are truncated.
pub(crate) struct Exact<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Exact<R> {
    pub(crate) const fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
        }
    }
}

impl<R: Read> Read for Exact<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "content ended before its declared size",
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalised() {
        let info = EntryInfo::dir("./docs/guide/");
        assert_eq!(info.path(), "docs/guide");
        assert_eq!(info.name(), "guide");
        assert_eq!(EntryInfo::file("", 0).path(), ".");
    }

    #[test]
    fn mode_keeps_permission_bits_only() {
        let info = EntryInfo::file("a", 1).with_mode(0o100_755);
        assert_eq!(info.mode(), 0o755);
    }

    #[test]
    fn exact_reader_detects_short_content() {
        let mut short = Exact::new(&b"abc"[..], 5);
        let err = io::copy(&mut short, &mut io::sink()).expect_err("short");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut long = Exact::new(&b"abcdef"[..], 4);
        let mut out = Vec::new();
        long.read_to_end(&mut out).expect("truncate");
        assert_eq!(out, b"abcd");
    }

    #[test]
    fn source_files_reopen_their_content() {
        let file = SourceFile::from_bytes("notes.txt", b"hello".to_vec());
        for _ in 0..2 {
            let mut text = String::new();
            file.open().expect("open").read_to_string(&mut text).expect("read");
            assert_eq!(text, "hello");
        }
        assert_eq!(file.info().size(), 5);
    }
}
