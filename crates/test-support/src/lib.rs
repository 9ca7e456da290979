//! Fixture builders shared by the workspace's tests.
//!
//! Archives are produced with the upstream `tar` and `zip` writers directly so
//! tests of the reading side never depend on the code they are checking.

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::Path;

use compress::CompressionLevel;
use tempfile::TempDir;

/// One item of a fixture archive or directory tree.
#[derive(Clone, Debug)]
pub enum Fixture {
    /// Regular file with contents and permission bits.
    File {
        /// `/`-separated path.
        path: String,
        /// File contents.
        data: Vec<u8>,
        /// Permission bits.
        mode: u32,
    },
    /// Explicitly stored directory.
    Dir {
        /// `/`-separated path without a trailing slash.
        path: String,
    },
    /// Symbolic link.
    Symlink {
        /// `/`-separated path.
        path: String,
        /// Link target, stored verbatim.
        target: String,
    },
}

impl Fixture {
    /// Regular file with mode `0o644`.
    pub fn file(path: &str, data: impl AsRef<[u8]>) -> Self {
        Self::File {
            path: path.to_owned(),
            data: data.as_ref().to_vec(),
            mode: 0o644,
        }
    }

    /// Regular file with explicit permission bits.
    pub fn file_with_mode(path: &str, data: impl AsRef<[u8]>, mode: u32) -> Self {
        Self::File {
            path: path.to_owned(),
            data: data.as_ref().to_vec(),
            mode,
        }
    }

    /// Directory entry.
    pub fn dir(path: &str) -> Self {
        Self::Dir {
            path: path.to_owned(),
        }
    }

    /// Symbolic link entry.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self::Symlink {
            path: path.to_owned(),
            target: target.to_owned(),
        }
    }

    /// Path of the fixture.
    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Dir { path } | Self::Symlink { path, .. } => path,
        }
    }
}

/// Modification time stamped on every tar fixture member, in Unix seconds.
pub const FIXTURE_MTIME: i64 = 1_700_000_000;

/// Builds an in-memory tar archive with entries in the given order.
pub fn tar_bytes(entries: &[Fixture]) -> Vec<u8> {
    try_tar_bytes(entries).expect("build tar fixture")
}

fn try_tar_bytes(entries: &[Fixture]) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(FIXTURE_MTIME as u64);
        match entry {
            Fixture::File { path, data, mode } => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(*mode);
                builder.append_data(&mut header, path, data.as_slice())?;
            }
            Fixture::Dir { path } => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, format!("{path}/"), io::empty())?;
            }
            Fixture::Symlink { path, target } => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder.append_link(&mut header, path, target)?;
            }
        }
    }
    builder.into_inner()
}

/// Builds an in-memory zip archive with entries in the given order.
pub fn zip_bytes(entries: &[Fixture]) -> Vec<u8> {
    try_zip_bytes(entries).expect("build zip fixture")
}

fn try_zip_bytes(entries: &[Fixture]) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        match entry {
            Fixture::File { path, data, mode } => {
                writer.start_file(path.as_str(), options.unix_permissions(*mode))?;
                writer.write_all(data)?;
            }
            Fixture::Dir { path } => {
                writer.add_directory(format!("{path}/"), options.unix_permissions(0o755))?;
            }
            Fixture::Symlink { path, target } => {
                writer.add_symlink(path.as_str(), target.as_str(), options)?;
            }
        }
    }
    Ok(writer.finish()?.into_inner())
}

/// Gzip-compresses `data`.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    compress::gzip::compress_to_vec(data, CompressionLevel::Default).expect("gzip fixture")
}

/// Creates a temporary directory populated with `entries`.
///
/// Parent directories are created as needed. Symlinks are only created on
/// Unix; elsewhere they are skipped.
pub fn temp_tree(entries: &[Fixture]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_tree(dir.path(), entries).expect("populate temp dir");
    dir
}

/// Writes `entries` below `root`.
pub fn write_tree(root: &Path, entries: &[Fixture]) -> io::Result<()> {
    for entry in entries {
        let target = root.join(entry.path());
        match entry {
            Fixture::File { data, mode, .. } => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, data)?;
                set_mode(&target, *mode)?;
            }
            Fixture::Dir { .. } => fs::create_dir_all(&target)?,
            Fixture::Symlink { target: link, .. } => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                #[cfg(unix)]
                std::os::unix::fs::symlink(link, &target)?;
                #[cfg(not(unix))]
                let _ = link;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
