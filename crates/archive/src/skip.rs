use crate::path::{is_within, normalize};

/// Directories whose remaining entries a walk ignores.
///
/// The list stays minimal: a directory already covered by a broader entry is
/// not added, and adding a broader directory evicts the narrower ones it
/// covers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SkipList {
    prefixes: Vec<String>,
}

impl SkipList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `dir` as skipped. Returns `false` when it was already covered.
    pub fn add(&mut self, dir: &str) -> bool {
        let dir = normalize(dir);
        if self.covers(&dir) {
            return false;
        }
        self.prefixes.retain(|existing| !is_within(existing, &dir));
        self.prefixes.push(dir);
        true
    }

    /// Returns `true` when `path` is, or lies beneath, a skipped directory.
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        self.prefixes.iter().any(|dir| is_within(path, dir))
    }

    /// Number of recorded directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Returns `true` when nothing is skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Recorded directories in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }
}
