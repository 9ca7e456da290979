use std::io::{self, Read, Write};
use std::sync::Arc;

use super::{Archiver, Compression, EntrySink, Extractor, MatchResult, Matcher};
use crate::cancel::CancelToken;
use crate::error::ArchiveError;
use crate::input::Input;
use crate::rewind::RewindReader;
use crate::walk::Handler;

/// A container stored inside a stream codec, such as `.tar.gz`.
///
/// Matching requires both layers: the outer codec on the raw bytes and the
/// container on the decoded bytes. Extraction and archiving wrap the inner
/// format's stream in the codec transparently.
pub struct CompressedArchive {
    name: String,
    compression: Arc<dyn Compression>,
    archive: Arc<dyn Extractor>,
}

impl CompressedArchive {
    /// Layers `archive` inside `compression`. The name concatenates both,
    /// container first.
    pub fn new(compression: Arc<dyn Compression>, archive: Arc<dyn Extractor>) -> Self {
        Self {
            name: format!("{}{}", archive.name(), compression.name()),
            compression,
            archive,
        }
    }

    /// Outer codec.
    #[must_use]
    pub fn compression(&self) -> &Arc<dyn Compression> {
        &self.compression
    }

    /// Inner container.
    #[must_use]
    pub fn archive(&self) -> &Arc<dyn Extractor> {
        &self.archive
    }

    fn inner_matches(&self, raw: &mut dyn Read) -> bool {
        let Ok(mut decoded) = self.compression.open_reader(Box::new(raw)) else {
            return false;
        };
        // Corrupt or truncated compressed data simply means "not this format".
        self.archive
            .matches("", Some(&mut *decoded))
            .is_ok_and(|result| result.by_stream)
    }
}

impl Matcher for CompressedArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, filename: &str, stream: Option<&mut dyn Read>) -> io::Result<MatchResult> {
        let by_name = self.compression.matches(filename, None)?.by_name
            && self.archive.matches(filename, None)?.by_name;
        let by_stream = match stream {
            Some(stream) => {
                let mut replay = RewindReader::new(stream);
                if self.compression.matches("", Some(&mut replay))?.by_stream {
                    replay.rewind()?;
                    self.inner_matches(&mut replay)
                } else {
                    false
                }
            }
            None => false,
        };
        Ok(MatchResult { by_name, by_stream })
    }
}

impl Extractor for CompressedArchive {
    fn extract(
        &self,
        cancel: &CancelToken,
        input: Input<'_>,
        paths: Option<&[String]>,
        handler: &mut Handler<'_>,
    ) -> Result<(), ArchiveError> {
        let decoded = self
            .compression
            .open_reader(input.into_read())
            .map_err(|err| ArchiveError::malformed(self.name.as_str(), err))?;
        self.archive
            .extract(cancel, Input::Stream(decoded), paths, handler)
    }

    fn archiver(&self) -> Option<&dyn Archiver> {
        self.archive.archiver().map(|_| self as &dyn Archiver)
    }
}

impl Archiver for CompressedArchive {
    fn archive_with(
        &self,
        cancel: &CancelToken,
        output: &mut dyn Write,
        feed: &mut dyn FnMut(&mut dyn EntrySink) -> Result<(), ArchiveError>,
    ) -> Result<(), ArchiveError> {
        let inner = self
            .archive
            .archiver()
            .ok_or_else(|| ArchiveError::Unsupported {
                format: self.name.clone(),
                operation: "archiving",
            })?;
        let mut encoder = self.compression.open_writer(Box::new(output))?;
        let written = inner.archive_with(cancel, &mut encoder, feed);
        let finished = encoder
            .finish_stream()
            .map(drop)
            .map_err(ArchiveError::from);
        written.and(finished)
    }
}

impl std::fmt::Debug for CompressedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedArchive")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, SourceFile};
    use crate::format::{Codec, Tar};
    use compress::{CompressionAlgorithm, CompressionLevel};

    fn tar_gz() -> CompressedArchive {
        CompressedArchive::new(
            Arc::new(Codec::new(CompressionAlgorithm::Gzip)),
            Arc::new(Tar::new()),
        )
    }

    #[test]
    fn name_puts_the_container_first() {
        assert_eq!(tar_gz().name(), ".tar.gz");
        let hint = tar_gz().matches("backup.tar.gz", None).expect("probe");
        assert!(hint.by_name && !hint.by_stream);
        assert!(!tar_gz().matches("backup.gz", None).expect("probe").matched());
    }

    #[test]
    fn compressed_text_is_not_a_compressed_archive() {
        let gz = CompressionAlgorithm::Gzip
            .compress_to_vec(b"this is text", CompressionLevel::Default)
            .expect("compress");
        let mut stream = &gz[..];
        assert!(!tar_gz().matches("", Some(&mut stream)).expect("probe").matched());
    }

    #[test]
    fn archive_then_extract() {
        let format = tar_gz();
        let mut archive = Vec::<u8>::new();
        format
            .archiver()
            .expect("writable")
            .archive(
                &CancelToken::new(),
                &mut archive,
                &[
                    SourceFile::directory("dir"),
                    SourceFile::from_bytes("dir/file.txt", b"payload".to_vec()),
                ],
            )
            .expect("archive");

        let mut stream = &archive[..];
        assert!(format.matches("", Some(&mut stream)).expect("probe").by_stream);

        let mut seen = Vec::new();
        format
            .extract(
                &CancelToken::new(),
                Input::stream(&archive[..]),
                None,
                &mut |entry: &mut Entry<'_>| {
                    let mut data = String::new();
                    entry.read_to_string(&mut data)?;
                    seen.push((entry.path().to_owned(), data));
                    Ok(crate::WalkControl::Continue)
                },
            )
            .expect("extract");
        assert_eq!(
            seen,
            [
                ("dir".to_owned(), String::new()),
                ("dir/file.txt".to_owned(), "payload".to_owned())
            ]
        );
    }
}
