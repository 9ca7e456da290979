//! Collecting files from disk for archiving.

use std::fs;
use std::path::{Path, PathBuf};

use logging::trace_archive;

use crate::entry::{EntryInfo, EntryKind, SourceFile};
use crate::error::ArchiveError;
use crate::path::{join, normalize};

/// Options for [`files_from_disk`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FromDiskOptions {
    /// Archive what symbolic links point at instead of the links.
    pub follow_symlinks: bool,
    /// Replace permissions and timestamps with the defaults, for
    /// reproducible archives.
    pub clear_attributes: bool,
}

/// Expands disk paths into archive members.
///
/// Each pair maps a file or directory on disk to its name in the archive.
/// Directories are walked recursively in name order, so the result is
/// deterministic. An empty archive name places a file under its own base
/// name and a directory's contents at the archive root.
///
/// # Errors
///
/// Returns [`ArchiveError::PathIo`] for the first path that cannot be read.
pub fn files_from_disk<P: AsRef<Path>>(
    options: &FromDiskOptions,
    roots: &[(P, &str)],
) -> Result<Vec<SourceFile>, ArchiveError> {
    let mut files = Vec::new();
    for (disk, name) in roots {
        let disk = disk.as_ref();
        let metadata = read_metadata(disk, options.follow_symlinks)?;
        let name = if name.is_empty() && !metadata.is_dir() {
            disk.file_name()
                .map(|file| file.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            normalize(name)
        };
        collect(options, disk, &name, &metadata, &mut files)?;
    }
    trace_archive!(debug, members = files.len(), "collected files from disk");
    Ok(files)
}

fn collect(
    options: &FromDiskOptions,
    disk: &Path,
    name: &str,
    metadata: &fs::Metadata,
    files: &mut Vec<SourceFile>,
) -> Result<(), ArchiveError> {
    if name != "." {
        files.push(source_file(options, disk, name, metadata)?);
    }
    if !metadata.is_dir() {
        return Ok(());
    }

    let mut children = fs::read_dir(disk)
        .map_err(|err| ArchiveError::path_io(disk, err))?
        .map(|dirent| dirent.map(|dirent| dirent.path()))
        .collect::<Result<Vec<PathBuf>, _>>()
        .map_err(|err| ArchiveError::path_io(disk, err))?;
    children.sort();
    for child in children {
        let child_meta = read_metadata(&child, options.follow_symlinks)?;
        let child_name = join(name, &child.file_name().map(|file| file.to_string_lossy()).unwrap_or_default());
        collect(options, &child, &child_name, &child_meta, files)?;
    }
    Ok(())
}

fn read_metadata(path: &Path, follow: bool) -> Result<fs::Metadata, ArchiveError> {
    let metadata = if follow {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    };
    metadata.map_err(|err| ArchiveError::path_io(path, err))
}

fn source_file(
    options: &FromDiskOptions,
    disk: &Path,
    name: &str,
    metadata: &fs::Metadata,
) -> Result<SourceFile, ArchiveError> {
    let mut info = EntryInfo::from_metadata(name, metadata);
    if options.clear_attributes {
        info = EntryInfo::new(info.path(), info.kind()).with_size(info.size());
    }
    if info.kind() == EntryKind::Symlink {
        let target = fs::read_link(disk).map_err(|err| ArchiveError::path_io(disk, err))?;
        info = info.with_link_target(target.to_string_lossy());
    }
    trace_archive!(trace, path = info.path(), "queued");
    Ok(SourceFile::from_disk(info, disk))
}
