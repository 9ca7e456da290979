use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{File, FileSystem};
use crate::closer::NoClose;
use crate::entry::{DirEntry, EntryInfo};
use crate::error::ArchiveError;
use crate::path::{join, valid_path};

/// A directory on disk behind the [`FileSystem`] interface.
#[derive(Clone, Debug)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    /// View rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory this view is rooted at.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, op: &'static str, name: &str) -> Result<PathBuf, ArchiveError> {
        if !valid_path(name) {
            return Err(ArchiveError::InvalidPath {
                op,
                path: name.to_owned(),
            });
        }
        Ok(name
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .fold(self.root.clone(), |path, part| path.join(part)))
    }

    fn list(&self, name: &str, disk: &Path) -> Result<Vec<DirEntry>, ArchiveError> {
        let mut entries = Vec::new();
        for dirent in fs::read_dir(disk).map_err(|err| ArchiveError::path_io(disk, err))? {
            let dirent = dirent.map_err(|err| ArchiveError::path_io(disk, err))?;
            let metadata = dirent
                .path()
                .symlink_metadata()
                .map_err(|err| ArchiveError::path_io(dirent.path(), err))?;
            let child = join(name, &dirent.file_name().to_string_lossy());
            entries.push(DirEntry::new(EntryInfo::from_metadata(&child, &metadata), false));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }
}

impl FileSystem for DirFs {
    fn open(&self, name: &str) -> Result<File, ArchiveError> {
        let disk = self.resolve("open", name)?;
        let metadata = fs::metadata(&disk).map_err(|err| ArchiveError::path_io(&disk, err))?;
        let info = EntryInfo::from_metadata(name, &metadata);
        if metadata.is_dir() {
            let entries = self.list(name, &disk)?;
            return Ok(File::directory(info, entries));
        }
        let file = fs::File::open(&disk).map_err(|err| ArchiveError::path_io(&disk, err))?;
        Ok(File::stream(info, NoClose(BufReader::new(file))))
    }

    fn stat(&self, name: &str) -> Result<EntryInfo, ArchiveError> {
        let disk = self.resolve("stat", name)?;
        let metadata = fs::symlink_metadata(&disk).map_err(|err| ArchiveError::path_io(&disk, err))?;
        let mut info = EntryInfo::from_metadata(name, &metadata);
        if metadata.file_type().is_symlink() {
            if let Ok(target) = fs::read_link(&disk) {
                info = info.with_link_target(target.to_string_lossy());
            }
        }
        Ok(info)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        let disk = self.resolve("readdir", name)?;
        let metadata = fs::metadata(&disk).map_err(|err| ArchiveError::path_io(&disk, err))?;
        if !metadata.is_dir() {
            return Err(ArchiveError::NotADirectory {
                op: "readdir",
                path: name.to_owned(),
            });
        }
        self.list(name, &disk)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>, ArchiveError> {
        let disk = self.resolve("sub", dir)?;
        let metadata = fs::metadata(&disk).map_err(|err| ArchiveError::path_io(&disk, err))?;
        if !metadata.is_dir() {
            return Err(ArchiveError::NotADirectory {
                op: "sub",
                path: dir.to_owned(),
            });
        }
        Ok(Box::new(Self::new(disk)))
    }
}
