use std::fs;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

use super::{File, FileSystem};
use crate::closer::NoClose;
use crate::entry::{DirEntry, EntryInfo};
use crate::error::ArchiveError;
use crate::format::{Compression, Decompressor, Matcher};
use crate::path::valid_path;

/// A single file on disk presented as a directory holding just that file.
///
/// When constructed with a codec the file's content is decompressed on read
/// and its size is reported as unknown (zero).
#[derive(Clone)]
pub struct FileFs {
    path: PathBuf,
    name: String,
    codec: Option<Arc<dyn Compression>>,
}

impl FileFs {
    /// View over `path`, decompressing with `codec` when given.
    pub fn new(path: impl Into<PathBuf>, codec: Option<Arc<dyn Compression>>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name, codec }
    }

    /// Name the file is listed under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn member_info(&self) -> Result<EntryInfo, ArchiveError> {
        let metadata = fs::metadata(&self.path).map_err(|err| ArchiveError::path_io(&self.path, err))?;
        let info = EntryInfo::from_metadata(&self.name, &metadata);
        Ok(if self.codec.is_some() { info.with_size(0) } else { info })
    }

    fn root_info(&self) -> EntryInfo {
        let modified = fs::metadata(&self.path).and_then(|meta| meta.modified()).ok();
        EntryInfo::dir(".").with_modified(modified)
    }

    fn check(&self, op: &'static str, name: &str) -> Result<bool, ArchiveError> {
        if !valid_path(name) {
            Err(ArchiveError::InvalidPath {
                op,
                path: name.to_owned(),
            })
        } else if name == "." {
            Ok(true)
        } else if name == self.name {
            Ok(false)
        } else {
            Err(ArchiveError::NotFound {
                op,
                path: name.to_owned(),
            })
        }
    }
}

impl FileSystem for FileFs {
    fn open(&self, name: &str) -> Result<File, ArchiveError> {
        if self.check("open", name)? {
            let listing = vec![DirEntry::new(self.member_info()?, false)];
            return Ok(File::directory(self.root_info(), listing));
        }
        let info = self.member_info()?;
        let file = fs::File::open(&self.path).map_err(|err| ArchiveError::path_io(&self.path, err))?;
        let reader: Box<dyn Read> = match &self.codec {
            Some(codec) => codec
                .open_reader(Box::new(BufReader::new(file)))
                .map_err(|err| ArchiveError::malformed(codec.name(), err))?,
            None => Box::new(BufReader::new(file)),
        };
        Ok(File::stream(info, NoClose(reader)))
    }

    fn stat(&self, name: &str) -> Result<EntryInfo, ArchiveError> {
        if self.check("stat", name)? {
            Ok(self.root_info())
        } else {
            self.member_info()
        }
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        if self.check("readdir", name)? {
            Ok(vec![DirEntry::new(self.member_info()?, false)])
        } else {
            Err(ArchiveError::NotADirectory {
                op: "readdir",
                path: name.to_owned(),
            })
        }
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>, ArchiveError> {
        if self.check("sub", dir)? {
            Ok(Box::new(self.clone()))
        } else {
            Err(ArchiveError::NotADirectory {
                op: "sub",
                path: dir.to_owned(),
            })
        }
    }
}

impl std::fmt::Debug for FileFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFs")
            .field("path", &self.path)
            .field("codec", &self.codec.as_ref().map(|codec| codec.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presents_one_plain_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain").expect("write");
        let view = FileFs::new(&path, None);

        let listing = view.read_dir(".").expect("list");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name(), "notes.txt");
        assert_eq!(view.stat("notes.txt").expect("stat").size(), 5);

        let mut text = String::new();
        view.open("notes.txt")
            .expect("open")
            .read_to_string(&mut text)
            .expect("read");
        assert_eq!(text, "plain");
        assert!(view.open("other.txt").expect_err("missing").is_not_found());
        assert!(view.sub("notes.txt").is_err());
    }

    #[test]
    fn malformed_names_are_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain").expect("write");
        let view = FileFs::new(&path, None);
        for name in ["../x", "/notes.txt", "notes.txt/", "", "./notes.txt"] {
            assert!(
                matches!(view.stat(name), Err(ArchiveError::InvalidPath { .. })),
                "{name:?}"
            );
            assert!(
                matches!(view.open(name), Err(ArchiveError::InvalidPath { .. })),
                "{name:?}"
            );
        }
    }
}
