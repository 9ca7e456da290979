use std::io::{self, Cursor, Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use logging::trace_archive;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

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

const NAME: &str = ".zip";
const LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Zip archives through the `zip` crate.
///
/// Reading needs random access, so a forward-only [`Input`] is buffered in
/// memory first. Writing builds the archive in memory and copies it to the
/// output once the central directory is complete. Hard links cannot be
/// represented and are rejected.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Zip {
    continue_on_error: bool,
}

impl Zip {
    /// Zip format that aborts a walk on the first handler error.
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

impl Matcher for Zip {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult> {
        let by_stream = probe_stream(stream, |stream| {
            let prefix = read_prefix(stream, LOCAL_HEADER.len())?;
            Ok(prefix == LOCAL_HEADER || prefix == EMPTY_ARCHIVE)
        })?;
        Ok(MatchResult {
            by_name: name_matches(filename, NAME),
            by_stream,
        })
    }
}

fn read_error(err: ZipError) -> ArchiveError {
    match err {
        ZipError::Io(err) => ArchiveError::malformed(NAME, err),
        other => ArchiveError::malformed(NAME, io::Error::new(io::ErrorKind::InvalidData, other)),
    }
}

fn write_error(err: ZipError) -> ArchiveError {
    match err {
        ZipError::Io(err) => ArchiveError::from(err),
        other => ArchiveError::Io(io::Error::other(other)),
    }
}

impl Extractor for Zip {
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
        let (source, _) = input.into_seekable()?;
        let mut archive = ZipArchive::new(source).map_err(read_error)?;
        for index in 0..archive.len() {
            walk.checkpoint()?;
            let mut member = archive.by_index(index).map_err(read_error)?;
            let path = normalize(member.name());
            if !walk.wants(&path) {
                continue;
            }
            let unix_mode = member.unix_mode();
            let kind = if member.is_dir() {
                EntryKind::Dir
            } else if unix_mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
                EntryKind::Symlink
            } else {
                EntryKind::File
            };
            let mut info =
                EntryInfo::new(&path, kind).with_modified(to_system_time(member.last_modified()));
            if let Some(mode) = unix_mode {
                info = info.with_mode(mode);
            }
            let mut empty = io::empty();
            let reader: &mut dyn Read = match kind {
                EntryKind::Symlink => {
                    let mut target = String::new();
                    member
                        .read_to_string(&mut target)
                        .map_err(|err| ArchiveError::malformed(NAME, err))?;
                    info = info.with_link_target(target);
                    &mut empty
                }
                EntryKind::File => {
                    info = info.with_size(member.size());
                    &mut member
                }
                _ => &mut empty,
            };
            let mut entry = Entry::new(info, reader);
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

impl Archiver for Zip {
    fn archive_with(
        &self,
        cancel: &CancelToken,
        output: &mut dyn Write,
        feed: &mut dyn FnMut(&mut dyn EntrySink) -> Result<(), ArchiveError>,
    ) -> Result<(), ArchiveError> {
        cancel.check()?;
        let mut sink = ZipSink {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        };
        let fed = feed(&mut sink);
        let finished = sink
            .writer
            .finish()
            .map_err(write_error)
            .and_then(|buffer| output.write_all(buffer.get_ref()).map_err(ArchiveError::from));
        fed.and(finished)
    }
}

struct ZipSink {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl EntrySink for ZipSink {
    fn add(&mut self, file: &SourceFile) -> Result<(), ArchiveError> {
        let info = file.info();
        let path = info.path();
        trace_archive!(debug, path, kind = ?info.kind(), "adding zip member");
        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(info.mode());
        if let Some(modified) = info.modified().and_then(to_zip_time) {
            options = options.last_modified_time(modified);
        }
        match info.kind() {
            EntryKind::Dir if path == "." => Ok(()),
            EntryKind::Dir => self
                .writer
                .add_directory(format!("{path}/"), options)
                .map_err(write_error),
            EntryKind::File => {
                let options = options.large_file(info.size() >= u64::from(u32::MAX));
                self.writer.start_file(path, options).map_err(write_error)?;
                let mut content = Exact::new(file.open()?, info.size());
                io::copy(&mut content, &mut self.writer)
                    .map(drop)
                    .map_err(|err| content_error(path, err))
            }
            EntryKind::Symlink => self
                .writer
                .add_symlink(path, info.link_target().unwrap_or_default(), options)
                .map_err(write_error),
            EntryKind::Hardlink => Err(ArchiveError::Unsupported {
                format: NAME.to_owned(),
                operation: "hard links",
            }),
        }
    }
}

fn to_system_time(time: impl Into<Option<DateTime>>) -> Option<SystemTime> {
    let time = time.into()?;
    let days = days_from_civil(
        i64::from(time.year()),
        i64::from(time.month()),
        i64::from(time.day()),
    );
    let seconds = days * 86_400
        + i64::from(time.hour()) * 3_600
        + i64::from(time.minute()) * 60
        + i64::from(time.second());
    u64::try_from(seconds)
        .ok()
        .map(|seconds| UNIX_EPOCH + Duration::from_secs(seconds))
}

/// Converts a UTC time to a zip timestamp. Zip cannot represent times
/// before 1980 or after 2107; those are left unset.
fn to_zip_time(time: SystemTime) -> Option<DateTime> {
    let seconds = i64::try_from(time.duration_since(UNIX_EPOCH).ok()?.as_secs()).ok()?;
    let (year, month, day) = civil_from_days(seconds.div_euclid(86_400));
    let rem = seconds.rem_euclid(86_400);
    DateTime::from_date_and_time(
        u16::try_from(year).ok()?,
        month as u8,
        day as u8,
        (rem / 3_600) as u8,
        (rem % 3_600 / 60) as u8,
        (rem % 60) as u8,
    )
    .ok()
}

// Proleptic Gregorian calendar conversions, days counted from 1970-01-01.

fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
