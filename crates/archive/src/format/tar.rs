use std::io::{self, Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use logging::{trace_archive, trace_extract};
use tar::{EntryType, Header};

use super::{
    Archiver, EntrySink, Extractor, MatchResult, Matcher, content_error, name_matches,
    probe_stream,
};
use crate::cancel::CancelToken;
use crate::entry::{Entry, EntryInfo, EntryKind, Exact, SourceFile};
use crate::error::ArchiveError;
use crate::input::Input;
use crate::path::normalize;
use crate::rewind::read_prefix;
use crate::walk::{Flow, Handler, Walk};

const NAME: &str = ".tar";
const BLOCK: usize = 512;
const CHECKSUM: std::ops::Range<usize> = 148..156;

/// POSIX tar archives, read and written through the `tar` crate.
///
/// Writing uses GNU headers so long names and large files round-trip.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tar {
    continue_on_error: bool,
}

impl Tar {
    /// Tar format that aborts a walk on the first handler error.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            continue_on_error: false,
        }
    }

    /// Logs handler errors and keeps walking instead of aborting.
    #[must_use]
    pub const fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }
}

impl Matcher for Tar {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult> {
        let by_stream = probe_stream(stream, |stream| {
            Ok(is_header_block(&read_prefix(stream, BLOCK)?))
        })?;
        Ok(MatchResult {
            by_name: name_matches(filename, NAME),
            by_stream,
        })
    }
}

/// Returns `true` for a full, non-zero block whose checksum field agrees with
/// its contents.
fn is_header_block(block: &[u8]) -> bool {
    if block.len() < BLOCK || block.iter().all(|&byte| byte == 0) {
        return false;
    }
    let Some(stored) = parse_octal(&block[CHECKSUM]) else {
        return false;
    };
    let mut unsigned = 0u32;
    let mut signed = 0i32;
    for (index, &byte) in block[..BLOCK].iter().enumerate() {
        let byte = if CHECKSUM.contains(&index) { b' ' } else { byte };
        unsigned += u32::from(byte);
        signed += i32::from(byte as i8);
    }
    stored == unsigned || i64::from(stored) == i64::from(signed)
}

fn parse_octal(field: &[u8]) -> Option<u32> {
    let digits = field
        .iter()
        .skip_while(|&&byte| byte == b' ')
        .take_while(|&&byte| (b'0'..=b'7').contains(&byte));
    let mut value = None;
    for &digit in digits {
        value = Some(value.unwrap_or(0u32).checked_mul(8)? + u32::from(digit - b'0'));
    }
    value
}

impl Extractor for Tar {
    fn extract(
        &self,
        cancel: &CancelToken,
        input: Input<'_>,
        paths: Option<&[String]>,
        handler: &mut Handler<'_>,
    ) -> Result<(), ArchiveError> {
        let mut walk = Walk::new(NAME, cancel, paths, self.continue_on_error);
        if walk.wants_nothing() {
            return Ok(());
        }
        let mut archive = tar::Archive::new(input.into_read());
        let members = archive
            .entries()
            .map_err(|err| ArchiveError::malformed(NAME, err))?;
        for member in members {
            walk.checkpoint()?;
            let mut member = member.map_err(|err| ArchiveError::malformed(NAME, err))?;
            let Some(info) = member_info(&member) else {
                continue;
            };
            if !walk.wants(info.path()) {
                continue;
            }
            let mut entry = Entry::new(info, &mut member);
            if walk.visit(&mut entry, handler)? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }

    fn archiver(&self) -> Option<&dyn Archiver> {
        Some(self)
    }
}

fn member_info<R: Read>(member: &tar::Entry<'_, R>) -> Option<EntryInfo> {
    let header = member.header();
    let entry_type = header.entry_type();
    let kind = match entry_type {
        EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => EntryKind::File,
        EntryType::Directory => EntryKind::Dir,
        EntryType::Symlink => EntryKind::Symlink,
        EntryType::Link => EntryKind::Hardlink,
        other => {
            trace_extract!(trace, entry_type = ?other, "ignoring tar member");
            return None;
        }
    };
    let path = String::from_utf8_lossy(&member.path_bytes()).into_owned();
    let mut info = EntryInfo::new(&path, kind);
    if let Ok(mode) = header.mode() {
        info = info.with_mode(mode);
    }
    if let Ok(mtime) = header.mtime() {
        info = info.with_modified(UNIX_EPOCH + Duration::from_secs(mtime));
    }
    if kind == EntryKind::File {
        info = info.with_size(member.size());
    }
    if let Some(target) = member.link_name_bytes() {
        let target = String::from_utf8_lossy(&target).into_owned();
        info = info.with_link_target(if kind == EntryKind::Hardlink {
            normalize(&target)
        } else {
            target
        });
    }
    Some(info)
}

impl Archiver for Tar {
    fn archive_with(
        &self,
        cancel: &CancelToken,
        output: &mut dyn Write,
        feed: &mut dyn FnMut(&mut dyn EntrySink) -> Result<(), ArchiveError>,
    ) -> Result<(), ArchiveError> {
        cancel.check()?;
        let mut sink = TarSink {
            builder: tar::Builder::new(output),
        };
        let fed = feed(&mut sink);
        let finished = sink.builder.into_inner().map(drop).map_err(ArchiveError::from);
        fed.and(finished)
    }
}

struct TarSink<'w> {
    builder: tar::Builder<&'w mut dyn Write>,
}

impl EntrySink for TarSink<'_> {
    fn add(&mut self, file: &SourceFile) -> Result<(), ArchiveError> {
        let info = file.info();
        let path = info.path();
        trace_archive!(debug, path, kind = ?info.kind(), "adding tar member");
        let mut header = Header::new_gnu();
        header.set_mode(info.mode());
        header.set_mtime(unix_seconds(info.modified()));
        header.set_size(0);
        match info.kind() {
            EntryKind::Dir if path == "." => Ok(()),
            EntryKind::Dir => {
                header.set_entry_type(EntryType::Directory);
                self.builder
                    .append_data(&mut header, format!("{path}/"), io::empty())
                    .map_err(ArchiveError::from)
            }
            EntryKind::File => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(info.size());
                let content = Exact::new(file.open()?, info.size());
                self.builder
                    .append_data(&mut header, path, content)
                    .map_err(|err| content_error(path, err))
            }
            EntryKind::Symlink | EntryKind::Hardlink => {
                header.set_entry_type(if info.is_symlink() {
                    EntryType::Symlink
                } else {
                    EntryType::Link
                });
                let target = info.link_target().unwrap_or_default();
                self.builder
                    .append_link(&mut header, path, target)
                    .map_err(ArchiveError::from)
            }
        }
    }
}

fn unix_seconds(time: Option<SystemTime>) -> u64 {
    time.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |elapsed| elapsed.as_secs())
}
