use std::fs;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use logging::{trace_fs, trace_index};

use super::index::Index;
use super::stream::{count_copies, open_member};
use super::{File, FileSystem, without_top_dir};
use crate::cancel::CancelToken;
use crate::entry::{DirEntry, Entry, EntryInfo};
use crate::error::ArchiveError;
use crate::format::{Extractor, Format, Matcher};
use crate::input::Input;
use crate::path::{join, valid_path};
use crate::walk::WalkControl;

/// Where an [`ArchiveFs`] reads its archive from. Every walk reopens the
/// source, so each one gets a fresh stream.
#[derive(Clone, Debug)]
pub enum ArchiveSource {
    /// An archive file on disk.
    Path(PathBuf),
    /// An archive held in memory.
    Bytes(Arc<[u8]>),
}

impl ArchiveSource {
    pub(super) fn open(&self) -> Result<Input<'static>, ArchiveError> {
        match self {
            Self::Path(path) => {
                let file = fs::File::open(path).map_err(|err| ArchiveError::path_io(path, err))?;
                Ok(Input::seekable(BufReader::new(file)))
            }
            Self::Bytes(bytes) => Ok(Input::seekable(Cursor::new(Arc::clone(bytes)))),
        }
    }

    fn modified(&self) -> Option<SystemTime> {
        match self {
            Self::Path(path) => fs::metadata(path).and_then(|meta| meta.modified()).ok(),
            Self::Bytes(_) => None,
        }
    }
}

pub(super) struct Shared {
    pub(super) source: ArchiveSource,
    pub(super) extractor: Arc<dyn Extractor>,
    index: Mutex<Option<Arc<Index>>>,
}

/// An archive presented as a read-only directory tree.
///
/// # Overview
///
/// Members are addressed by their normalised archive paths. Directories that
/// were never stored but are implied by deeper members are synthesised.
///
/// # Design
///
/// Archives only support a linear walk, so lookups are lazy:
///
/// - [`open`](FileSystem::open) and [`stat`](FileSystem::stat) walk only as
///   far as they need to until the index exists.
/// - [`read_dir`](FileSystem::read_dir) builds the full index with one walk
///   over the whole archive and serves every later call from it. A failed
///   build leaves no index behind, so the next call walks again.
/// - [`sub`](FileSystem::sub) views share the index with their parent.
///
/// Opening a regular file streams its content from a worker thread that owns
/// the archive stream. Closing the returned [`File`] closes the member
/// stream first and then the archive stream.
#[derive(Clone)]
pub struct ArchiveFs {
    shared: Arc<Shared>,
    prefix: String,
    cancel: CancelToken,
}

impl ArchiveFs {
    /// Creates a view over `source` read with `format`.
    ///
    /// Fails with [`ArchiveError::Unsupported`] for compression-only formats.
    pub fn new(source: ArchiveSource, format: &Format) -> Result<Self, ArchiveError> {
        let extractor = format.extractor().ok_or_else(|| ArchiveError::Unsupported {
            format: format.name().to_owned(),
            operation: "browsing as a file system",
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                source,
                extractor,
                index: Mutex::new(None),
            }),
            prefix: ".".to_owned(),
            cancel: CancelToken::new(),
        })
    }

    /// View over an in-memory archive.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, format: &Format) -> Result<Self, ArchiveError> {
        Self::new(ArchiveSource::Bytes(bytes.into()), format)
    }

    /// View over an archive file on disk.
    pub fn open_path(path: impl Into<PathBuf>, format: &Format) -> Result<Self, ArchiveError> {
        Self::new(ArchiveSource::Path(path.into()), format)
    }

    /// Governs every walk of this view with `cancel`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Root of this view inside the archive; `"."` unless created by `sub`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Like [`open`](FileSystem::open), retrying without the first path
    /// element when `name` fails as given.
    pub fn top_dir_open(&self, name: &str) -> Result<File, ArchiveError> {
        without_top_dir(name, |name| self.open(name))
    }

    /// Like [`stat`](FileSystem::stat), retrying without the first path
    /// element when `name` fails as given.
    pub fn top_dir_stat(&self, name: &str) -> Result<EntryInfo, ArchiveError> {
        without_top_dir(name, |name| self.stat(name))
    }

    /// Like [`read_dir`](FileSystem::read_dir), retrying without the first
    /// path element when `name` fails as given.
    pub fn top_dir_read_dir(&self, name: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        without_top_dir(name, |name| self.read_dir(name))
    }

    fn resolve(&self, op: &'static str, name: &str) -> Result<String, ArchiveError> {
        if valid_path(name) {
            Ok(join(&self.prefix, name))
        } else {
            Err(ArchiveError::InvalidPath {
                op,
                path: name.to_owned(),
            })
        }
    }

    fn cached_index(&self) -> Option<Arc<Index>> {
        self.shared
            .index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the index, walking the whole archive the first time.
    fn index(&self) -> Result<Arc<Index>, ArchiveError> {
        let mut slot = self
            .shared
            .index
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }
        let mut index = Index::new();
        let input = self.shared.source.open()?;
        let built = self.shared.extractor.extract(
            &self.cancel,
            input,
            None,
            &mut |entry: &mut Entry<'_>| {
                index.insert(entry.info().clone());
                Ok(WalkControl::Continue)
            },
        );
        if let Err(err) = built {
            trace_index!(debug, error = %err, "index build failed");
            return Err(err);
        }
        trace_index!(debug, entries = index.len(), "index built");
        let index = Arc::new(index);
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    fn root_info(&self) -> EntryInfo {
        EntryInfo::dir(".").with_modified(self.shared.source.modified())
    }

    fn not_found(op: &'static str, name: &str) -> ArchiveError {
        ArchiveError::NotFound {
            op,
            path: name.to_owned(),
        }
    }
}

impl FileSystem for ArchiveFs {
    fn open(&self, name: &str) -> Result<File, ArchiveError> {
        let target = self.resolve("open", name)?;
        trace_fs!(trace, path = %target, "open");
        let index = if target == "." {
            Some(self.index()?)
        } else {
            self.cached_index()
        };
        let Some(index) = index else {
            let skip = count_copies(&self.shared, &self.cancel, &target)?.saturating_sub(1);
            return open_member(&self.shared, &self.cancel, name, target, false, skip);
        };
        match index.stat(&target) {
            Some(info) if info.is_dir() => {
                let info = if target == "." { self.root_info() } else { info };
                let entries = index.list(&target).map(<[DirEntry]>::to_vec).unwrap_or_default();
                Ok(File::directory(info, entries))
            }
            Some(_) => {
                let skip = index.copies(&target).saturating_sub(1);
                open_member(&self.shared, &self.cancel, name, target, true, skip)
            }
            None => Err(Self::not_found("open", name)),
        }
    }

    fn stat(&self, name: &str) -> Result<EntryInfo, ArchiveError> {
        let target = self.resolve("stat", name)?;
        if target == "." {
            return Ok(self.root_info());
        }
        if let Some(index) = self.cached_index() {
            return index.stat(&target).ok_or_else(|| Self::not_found("stat", name));
        }

        let mut found = None;
        let mut has_descendants = false;
        let filter = [target.clone()];
        self.shared.extractor.extract(
            &self.cancel,
            self.shared.source.open()?,
            Some(&filter[..]),
            &mut |entry: &mut Entry<'_>| {
                // Later copies of a path replace earlier ones.
                if entry.path() == target {
                    found = Some(entry.info().clone());
                } else {
                    has_descendants = true;
                }
                Ok(WalkControl::Continue)
            },
        )?;
        match found {
            Some(info) => Ok(info),
            None if has_descendants => Ok(EntryInfo::implicit_dir(&target)),
            None => Err(Self::not_found("stat", name)),
        }
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        let target = self.resolve("readdir", name)?;
        let index = self.index()?;
        if index.is_non_dir(&target) {
            return Err(ArchiveError::NotADirectory {
                op: "readdir",
                path: name.to_owned(),
            });
        }
        index
            .list(&target)
            .map(<[DirEntry]>::to_vec)
            .ok_or_else(|| Self::not_found("readdir", name))
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>, ArchiveError> {
        let info = self.stat(dir)?;
        if !info.is_dir() {
            return Err(ArchiveError::NotADirectory {
                op: "sub",
                path: dir.to_owned(),
            });
        }
        let mut view = self.clone();
        view.prefix = join(&self.prefix, dir);
        Ok(Box::new(view))
    }
}

impl std::fmt::Debug for ArchiveFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveFs")
            .field("source", &self.shared.source)
            .field("format", &self.shared.extractor.name())
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
