//! Live member streams for [`ArchiveFs::open`](super::ArchiveFs).
//!
//! A member's reader only lives inside a walk callback, so opening a file
//! runs the walk on a worker thread that forwards the content over a bounded
//! channel. The returned stream owns the receiving end (outer) and the worker
//! that owns the archive stream (inner).

use std::io::{self, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use logging::trace_fs;

use super::File;
use super::archive::Shared;
use super::index::Index;
use crate::cancel::CancelToken;
use crate::closer::{Close, CloseBoth};
use crate::entry::{DirEntry, Entry, EntryInfo};
use crate::error::ArchiveError;
use crate::format::Extractor;
use crate::path::is_within;
use crate::walk::WalkControl;

const CHUNK_SIZE: usize = 32 * 1024;
const CHANNEL_DEPTH: usize = 4;

enum Message {
    File(EntryInfo),
    Chunk(io::Result<Vec<u8>>),
    Dir(EntryInfo, Vec<DirEntry>),
}

/// Counts the stored copies of the file `target` with a filtered walk.
pub(super) fn count_copies(
    shared: &Shared,
    cancel: &CancelToken,
    target: &str,
) -> Result<usize, ArchiveError> {
    let filter = [target.to_owned()];
    let mut copies = 0;
    shared.extractor.extract(
        cancel,
        shared.source.open()?,
        Some(&filter[..]),
        &mut |entry: &mut Entry<'_>| {
            if entry.path() == target && !entry.is_dir() {
                copies += 1;
            }
            Ok(WalkControl::Continue)
        },
    )?;
    Ok(copies)
}

/// Opens `target` by walking the archive on a worker thread.
///
/// With `filtered` the walk only visits `target` and its descendants.
/// Otherwise it visits everything and stops once it leaves the subtree of a
/// directory target. The first `skip` stored copies of a file target are
/// passed over, so callers pick the last copy by passing the count minus one.
pub(super) fn open_member(
    shared: &Arc<Shared>,
    cancel: &CancelToken,
    name: &str,
    target: String,
    filtered: bool,
    skip: usize,
) -> Result<File, ArchiveError> {
    let (tx, rx) = bounded(CHANNEL_DEPTH);
    let worker_shared = Arc::clone(shared);
    let worker_cancel = cancel.clone();
    let handle = thread::Builder::new()
        .name("archive-member".to_owned())
        .spawn(move || walk_member(&worker_shared, &worker_cancel, &target, filtered, skip, &tx))
        .map_err(ArchiveError::Io)?;
    let worker = Worker {
        handle: Some(handle),
    };

    match rx.recv() {
        Ok(Message::File(info)) => {
            trace_fs!(trace, path = info.path(), "streaming member");
            let stream = MemberStream {
                rx: Some(rx),
                chunk: Vec::new(),
                pos: 0,
            };
            Ok(File::stream(info, CloseBoth::new(stream, worker)))
        }
        Ok(Message::Dir(info, entries)) => {
            drop(rx);
            worker.join()?;
            Ok(File::directory(info, entries))
        }
        Ok(Message::Chunk(_)) => {
            drop(rx);
            worker.join()?;
            Err(ArchiveError::Io(io::Error::other("member data arrived before its metadata")))
        }
        Err(_) => {
            drop(rx);
            worker.join()?;
            Err(ArchiveError::NotFound {
                op: "open",
                path: name.to_owned(),
            })
        }
    }
}

fn walk_member(
    shared: &Shared,
    cancel: &CancelToken,
    target: &str,
    filtered: bool,
    mut skip: usize,
    tx: &Sender<Message>,
) -> Result<(), ArchiveError> {
    let input = shared.source.open()?;
    let filter = [target.to_owned()];
    let paths = filtered.then_some(&filter[..]);
    let mut subtree = Index::new();
    let mut inside = false;

    shared
        .extractor
        .extract(cancel, input, paths, &mut |entry: &mut Entry<'_>| {
            let path = entry.path();
            if path == target && !entry.is_dir() {
                if skip > 0 {
                    skip -= 1;
                    return Ok(WalkControl::Continue);
                }
                return Ok(forward(entry, tx));
            }
            if path == target || is_within(path, target) {
                inside = true;
                subtree.insert(entry.info().clone());
                Ok(WalkControl::Continue)
            } else if inside {
                Ok(WalkControl::SkipAll)
            } else {
                Ok(WalkControl::Continue)
            }
        })?;

    if inside {
        let info = subtree
            .stat(target)
            .unwrap_or_else(|| EntryInfo::implicit_dir(target));
        let entries = subtree.list(target).map(<[DirEntry]>::to_vec).unwrap_or_default();
        // The opener may already have given up.
        let _ = tx.send(Message::Dir(info, entries));
    }
    Ok(())
}

/// Sends the member's metadata and content, then ends the walk.
fn forward(entry: &mut Entry<'_>, tx: &Sender<Message>) -> WalkControl {
    if tx.send(Message::File(entry.info().clone())).is_err() {
        return WalkControl::SkipAll;
    }
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let message = match entry.read(&mut buf) {
            Ok(0) => return WalkControl::SkipAll,
            Ok(n) => Message::Chunk(Ok(buf[..n].to_vec())),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(Message::Chunk(Err(err)));
                return WalkControl::SkipAll;
            }
        };
        if tx.send(message).is_err() {
            return WalkControl::SkipAll;
        }
    }
}

/// Receiving half of a member stream.
struct MemberStream {
    rx: Option<Receiver<Message>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for MemberStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            let Some(rx) = &self.rx else {
                return Err(io::Error::other("read from a closed member stream"));
            };
            match rx.recv() {
                Ok(Message::Chunk(Ok(data))) => {
                    self.chunk = data;
                    self.pos = 0;
                }
                Ok(Message::Chunk(Err(err))) => return Err(err),
                Ok(Message::File(_) | Message::Dir(..)) => {
                    return Err(io::Error::other("unexpected message in member stream"));
                }
                Err(_) => return Ok(0),
            }
        }
        let n = (self.chunk.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Close for MemberStream {
    fn close(&mut self) -> io::Result<()> {
        // Dropping the receiver makes the worker's next send fail, which
        // ends its walk.
        self.rx = None;
        Ok(())
    }
}

/// The thread owning the archive stream.
struct Worker {
    handle: Option<JoinHandle<Result<(), ArchiveError>>>,
}

impl Worker {
    fn join(mut self) -> Result<(), ArchiveError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), ArchiveError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(ArchiveError::Io(io::Error::other("archive worker panicked")))),
            None => Ok(()),
        }
    }
}

impl Close for Worker {
    fn close(&mut self) -> io::Result<()> {
        self.finish().map_err(io::Error::from)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
