//! Shared bookkeeping for extraction walks.
//!
//! Every extractor drives the same loop: check for cancellation, decide
//! whether the next entry is wanted, hand it to the caller's handler and
//! interpret the answer. [`Walk`] keeps that policy in one place so the
//! format modules only translate their native entries.

use logging::trace_extract;

use crate::cancel::CancelToken;
use crate::entry::Entry;
use crate::error::ArchiveError;
use crate::path::{parent, path_included};
use crate::skip::SkipList;

/// Handler answer steering an extraction walk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WalkControl {
    /// Visit the next entry.
    #[default]
    Continue,
    /// For a directory, skip its subtree. For a file, skip the rest of its
    /// containing directory.
    SkipDir,
    /// End the walk without an error.
    SkipAll,
}

/// Per-entry callback of [`Extractor::extract`](crate::Extractor::extract).
pub type Handler<'h> = dyn FnMut(&mut Entry<'_>) -> Result<WalkControl, ArchiveError> + 'h;

/// What a format loop does after visiting an entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Flow {
    Next,
    Stop,
}

pub(crate) struct Walk<'a> {
    format: &'a str,
    cancel: &'a CancelToken,
    paths: Option<&'a [String]>,
    continue_on_error: bool,
    skip: SkipList,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(
        format: &'a str,
        cancel: &'a CancelToken,
        paths: Option<&'a [String]>,
        continue_on_error: bool,
    ) -> Self {
        Self {
            format,
            cancel,
            paths,
            continue_on_error,
            skip: SkipList::new(),
        }
    }

    /// Runs at the top of every iteration.
    pub(crate) fn checkpoint(&self) -> Result<(), ArchiveError> {
        self.cancel.check()
    }

    /// Returns `true` when the filter admits nothing at all.
    pub(crate) fn wants_nothing(&self) -> bool {
        self.paths.is_some_and(<[String]>::is_empty)
    }

    pub(crate) fn wants(&self, path: &str) -> bool {
        path_included(self.paths, path) && !self.skip.covers(path)
    }

    pub(crate) fn visit(
        &mut self,
        entry: &mut Entry<'_>,
        handler: &mut Handler<'_>,
    ) -> Result<Flow, ArchiveError> {
        match handler(entry) {
            Ok(WalkControl::Continue) => Ok(Flow::Next),
            Ok(WalkControl::SkipDir) => {
                let dir = if entry.is_dir() {
                    entry.path()
                } else {
                    parent(entry.path())
                };
                if self.skip.add(dir) {
                    trace_extract!(debug, format = self.format, dir, "skipping directory");
                }
                Ok(Flow::Next)
            }
            Ok(WalkControl::SkipAll) => Ok(Flow::Stop),
            Err(err)
                if err.is_cancelled() || self.cancel.is_cancelled() || !self.continue_on_error =>
            {
                Err(err)
            }
            Err(err) => {
                trace_extract!(
                    warn,
                    format = self.format,
                    path = entry.path(),
                    error = %err,
                    "entry failed; continuing"
                );
                Ok(Flow::Next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryInfo;
    use std::io;

    fn run(
        walk: &mut Walk<'_>,
        paths: &[&str],
        handler: &mut Handler<'_>,
    ) -> Result<Vec<String>, ArchiveError> {
        let mut seen = Vec::new();
        for path in paths {
            walk.checkpoint()?;
            if !walk.wants(path) {
                continue;
            }
            seen.push((*path).to_owned());
            let info = if path.ends_with(".txt") {
                EntryInfo::file(path, 0)
            } else {
                EntryInfo::dir(path)
            };
            let mut empty = io::empty();
            let mut entry = Entry::new(info, &mut empty);
            if walk.visit(&mut entry, handler)? == Flow::Stop {
                break;
            }
        }
        Ok(seen)
    }

    #[test]
    fn skip_dir_on_a_file_skips_its_siblings() {
        let cancel = CancelToken::new();
        let mut walk = Walk::new(".test", &cancel, None, false);
        let order = ["a", "a/1.txt", "a/2.txt", "a/sub", "a/sub/3.txt", "b.txt"];
        let seen = run(&mut walk, &order, &mut |entry: &mut Entry<'_>| {
            Ok(if entry.path() == "a/1.txt" {
                WalkControl::SkipDir
            } else {
                WalkControl::Continue
            })
        })
        .expect("walk");
        assert_eq!(seen, ["a", "a/1.txt", "b.txt"]);
    }

    #[test]
    fn skip_all_stops_without_error() {
        let cancel = CancelToken::new();
        let mut walk = Walk::new(".test", &cancel, None, false);
        let seen = run(&mut walk, &["x", "y", "z"], &mut |_: &mut Entry<'_>| {
            Ok(WalkControl::SkipAll)
        })
        .expect("walk");
        assert_eq!(seen, ["x"]);
    }

    #[test]
    fn continue_on_error_logs_and_proceeds() {
        let cancel = CancelToken::new();
        let mut walk = Walk::new(".test", &cancel, None, true);
        let seen = run(&mut walk, &["x", "y"], &mut |_: &mut Entry<'_>| {
            Err(ArchiveError::other("handler failed"))
        })
        .expect("errors absorbed");
        assert_eq!(seen, ["x", "y"]);

        let mut strict = Walk::new(".test", &cancel, None, false);
        let err = run(&mut strict, &["x", "y"], &mut |_: &mut Entry<'_>| {
            Err(ArchiveError::other("handler failed"))
        })
        .expect_err("aborts");
        assert_eq!(err.to_string(), "handler failed");
    }

    #[test]
    fn cancellation_overrides_continue_on_error() {
        let cancel = CancelToken::new();
        let mut walk = Walk::new(".test", &cancel, None, true);
        let trigger = cancel.clone();
        let err = run(&mut walk, &["x", "y", "z"], &mut |_: &mut Entry<'_>| {
            trigger.cancel();
            Err(ArchiveError::other("after cancel"))
        })
        .expect_err("cancelled");
        assert_eq!(err.to_string(), "after cancel");
        assert!(walk.checkpoint().expect_err("flag").is_cancelled());
    }

    #[test]
    fn filter_limits_visits() {
        let cancel = CancelToken::new();
        let filter = vec!["a".to_owned()];
        let mut walk = Walk::new(".test", &cancel, Some(&filter), false);
        let seen = run(&mut walk, &["a", "ab", "a/x.txt"], &mut |_: &mut Entry<'_>| {
            Ok(WalkControl::Continue)
        })
        .expect("walk");
        assert_eq!(seen, ["a", "a/x.txt"]);
        let none: Vec<String> = Vec::new();
        assert!(Walk::new(".test", &cancel, Some(&none), false).wants_nothing());
    }
}
