//! Extracting an archive onto disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::{FileTime, set_file_mtime, set_symlink_file_times};
use logging::trace_extract;

use crate::cancel::CancelToken;
use crate::entry::{Entry, EntryKind};
use crate::error::ArchiveError;
use crate::format::Extractor;
use crate::input::Input;
use crate::path::safe_join;
use crate::walk::WalkControl;

/// Writes every member of `input` beneath `dest` and returns how many were
/// written.
///
/// Member paths are resolved with [`safe_join`], so a member that would land
/// outside `dest` fails with [`ArchiveError::ZipSlip`] before anything is
/// written for it. Members beneath a symbolic link created by an earlier
/// member are rejected the same way. Permission bits, symbolic links and
/// hard links are applied on Unix. Modification times are restored for
/// files, links and directories; directory times are set once the walk has
/// finished, since writing a child touches its parent.
pub fn extract_to_dir(
    extractor: &dyn Extractor,
    cancel: &CancelToken,
    input: Input<'_>,
    dest: &Path,
) -> Result<usize, ArchiveError> {
    fs::create_dir_all(dest).map_err(|err| ArchiveError::path_io(dest, err))?;
    let mut written = 0usize;
    let mut dir_times = Vec::new();
    extractor.extract(cancel, input, None, &mut |entry: &mut Entry<'_>| {
        write_entry(dest, entry, &mut dir_times)?;
        written += 1;
        Ok(WalkControl::Continue)
    })?;
    for (dir, modified) in dir_times.iter().rev() {
        set_file_mtime(dir, *modified).map_err(|err| ArchiveError::path_io(dir, err))?;
    }
    trace_extract!(debug, written, dest = %dest.display(), "extracted to directory");
    Ok(written)
}

fn write_entry(
    dest: &Path,
    entry: &mut Entry<'_>,
    dir_times: &mut Vec<(PathBuf, FileTime)>,
) -> Result<(), ArchiveError> {
    let info = entry.info().clone();
    if info.path() == "." {
        return Ok(());
    }
    let target = safe_join(dest, info.path())?;
    reject_linked_ancestors(dest, &target, info.path())?;
    let io_err = |err: io::Error| ArchiveError::path_io(&target, err);
    let modified = info.modified().map(FileTime::from_system_time);

    match info.kind() {
        EntryKind::Dir => {
            fs::create_dir_all(&target).map_err(io_err)?;
            apply_mode(&target, info.mode()).map_err(io_err)?;
            if let Some(modified) = modified {
                dir_times.push((target.clone(), modified));
            }
        }
        EntryKind::File => {
            create_parent(&target)?;
            let mut file = fs::File::create(&target).map_err(io_err)?;
            io::copy(entry, &mut file).map_err(|err| match err.kind() {
                io::ErrorKind::UnexpectedEof => ArchiveError::WriteAborted {
                    path: info.path().to_owned(),
                },
                _ => ArchiveError::from(err),
            })?;
            drop(file);
            apply_mode(&target, info.mode()).map_err(io_err)?;
            if let Some(modified) = modified {
                set_file_mtime(&target, modified).map_err(io_err)?;
            }
        }
        EntryKind::Symlink => {
            create_parent(&target)?;
            let link = info.link_target().unwrap_or_default();
            symlink(link, &target).map_err(io_err)?;
            if let Some(modified) = modified {
                set_symlink_file_times(&target, modified, modified).map_err(io_err)?;
            }
        }
        EntryKind::Hardlink => {
            create_parent(&target)?;
            let original = safe_join(dest, info.link_target().unwrap_or_default())?;
            fs::hard_link(&original, &target).map_err(io_err)?;
        }
    }
    trace_extract!(trace, path = info.path(), "written");
    Ok(())
}

fn create_parent(target: &Path) -> Result<(), ArchiveError> {
    match target.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|err| ArchiveError::path_io(parent, err)),
        None => Ok(()),
    }
}

/// Fails when any existing directory between `dest` and `target` is a
/// symbolic link, which an earlier member could have planted.
fn reject_linked_ancestors(dest: &Path, target: &Path, member: &str) -> Result<(), ArchiveError> {
    let Ok(relative) = target.strip_prefix(dest) else {
        return Err(ArchiveError::ZipSlip {
            path: member.to_owned(),
        });
    };
    let mut current = PathBuf::from(dest);
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(ArchiveError::ZipSlip {
                    path: member.to_owned(),
                });
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn symlink(link: &str, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn symlink(_link: &str, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are only created on Unix",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Tar;
    use test_support::{FIXTURE_MTIME, Fixture, tar_bytes};

    #[test]
    fn writes_files_and_directories() {
        let archive = tar_bytes(&[
            Fixture::dir("docs"),
            Fixture::file_with_mode("docs/run.sh", b"#!/bin/sh\n", 0o755),
            Fixture::file("top.txt", b"top"),
        ]);
        let dest = tempfile::tempdir().expect("tempdir");
        let written = extract_to_dir(
            &Tar::new(),
            &CancelToken::new(),
            Input::stream(&archive[..]),
            dest.path(),
        )
        .expect("extract");
        assert_eq!(written, 3);
        assert_eq!(fs::read(dest.path().join("top.txt")).expect("read"), b"top");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.path().join("docs/run.sh"))
                .expect("stat")
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[cfg(unix)]
    #[test]
    fn restores_modification_times() {
        let archive = tar_bytes(&[
            Fixture::dir("d"),
            Fixture::dir("d/inner"),
            Fixture::file("d/inner/f.txt", b"late child"),
            Fixture::symlink("d/link", "inner/f.txt"),
        ]);
        let dest = tempfile::tempdir().expect("tempdir");
        extract_to_dir(
            &Tar::new(),
            &CancelToken::new(),
            Input::stream(&archive[..]),
            dest.path(),
        )
        .expect("extract");

        let stored = FileTime::from_unix_time(FIXTURE_MTIME, 0);
        for path in ["d", "d/inner", "d/inner/f.txt"] {
            let meta = fs::metadata(dest.path().join(path)).expect(path);
            assert_eq!(FileTime::from_last_modification_time(&meta), stored, "{path}");
        }
        let meta = fs::symlink_metadata(dest.path().join("d/link")).expect("lstat");
        assert_eq!(FileTime::from_last_modification_time(&meta), stored);
    }

    #[cfg(unix)]
    #[test]
    fn refuses_to_write_through_planted_symlinks() {
        let outside = tempfile::tempdir().expect("tempdir");
        let link_target = outside.path().to_string_lossy().into_owned();
        let archive = tar_bytes(&[
            Fixture::symlink("escape", &link_target),
            Fixture::file("escape/payload", b"owned"),
        ]);
        let dest = tempfile::tempdir().expect("tempdir");
        let err = extract_to_dir(
            &Tar::new(),
            &CancelToken::new(),
            Input::stream(&archive[..]),
            dest.path(),
        )
        .expect_err("must refuse");
        assert!(matches!(err, ArchiveError::ZipSlip { .. }));
        assert!(!outside.path().join("payload").exists());
    }
}
