use std::io::{self, Read};
use std::time::SystemTime;

use sevenz_rust::{Password, SevenZReader};

use super::{Extractor, MatchResult, Matcher, name_matches, probe_stream};
use crate::cancel::CancelToken;
use crate::entry::{Entry, EntryInfo, EntryKind};
use crate::error::ArchiveError;
use crate::input::Input;
use crate::rewind::read_prefix;
use crate::walk::{Flow, Handler, Walk};

const NAME: &str = ".7z";
const MAGIC: &[u8] = b"7z\xBC\xAF\x27\x1C";

/// 7z archives, extraction only, through `sevenz-rust`.
///
/// Encrypted archives are not supported. Members without a data stream,
/// directories included, are reported after every member that has one, in
/// the order the archive's reader yields them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SevenZip {
    continue_on_error: bool,
}

impl SevenZip {
    /// 7z format that aborts a walk on the first handler error.
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

impl Matcher for SevenZip {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult> {
        let by_stream = probe_stream(stream, |stream| {
            Ok(read_prefix(stream, MAGIC.len())? == MAGIC)
        })?;
        Ok(MatchResult {
            by_name: name_matches(filename, NAME),
            by_stream,
        })
    }
}

fn read_error(err: &sevenz_rust::Error) -> ArchiveError {
    ArchiveError::malformed(
        NAME,
        io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
    )
}

impl Extractor for SevenZip {
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
        let (source, len) = input.into_seekable()?;
        let mut archive =
            SevenZReader::new(source, len, Password::empty()).map_err(|err| read_error(&err))?;

        // The reader's callback can only answer "continue" or "stop", so our
        // own error waits here until the walk has unwound.
        let mut failure = None;
        let outcome = archive.for_each_entries(|member, content| {
            if let Err(err) = walk.checkpoint() {
                failure = Some(err);
                return Ok(false);
            }
            let kind = if member.is_directory {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            let mut info = EntryInfo::new(&member.name, kind);
            if kind == EntryKind::File {
                info = info.with_size(member.size);
            }
            if member.has_last_modified_date {
                info = info.with_modified(SystemTime::from(member.last_modified_date));
            }
            if walk.wants(info.path()) {
                let mut entry = Entry::new(info, content);
                match walk.visit(&mut entry, handler) {
                    Ok(Flow::Next) => {}
                    Ok(Flow::Stop) => return Ok(false),
                    Err(err) => {
                        failure = Some(err);
                        return Ok(false);
                    }
                }
            }
            // Solid blocks decode sequentially; unread content must be consumed.
            if let Err(err) = io::copy(content, &mut io::sink()) {
                failure = Some(ArchiveError::malformed(NAME, err));
                return Ok(false);
            }
            Ok(true)
        });
        if let Some(err) = failure {
            return Err(err);
        }
        outcome.map_err(|err| read_error(&err))
    }
}
