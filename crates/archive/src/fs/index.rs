use std::collections::HashMap;

use logging::trace_index;

use crate::entry::{DirEntry, EntryInfo};
use crate::path::{parent, valid_path};

/// Directory tree reconstructed from a flat member list.
///
/// `contents` maps every stored member to its metadata. `dirs` maps every
/// directory, stored or implied, to its children sorted by name. Every
/// ancestor of every member is a key of `dirs`, and `"."` always is.
///
/// A path stored more than once, as in an appended tar, resolves to its last
/// copy; `copies` counts how many there were.
#[derive(Debug)]
pub(crate) struct Index {
    contents: HashMap<String, EntryInfo>,
    dirs: HashMap<String, Vec<DirEntry>>,
    copies: HashMap<String, usize>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            contents: HashMap::new(),
            dirs: HashMap::from([(".".to_owned(), Vec::new())]),
            copies: HashMap::new(),
        }
    }
}

impl Index {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records one member. Members named `"."` and paths that climb out of
    /// the archive are ignored.
    pub(crate) fn insert(&mut self, info: EntryInfo) {
        let path = info.path().to_owned();
        if path == "." || !valid_path(&path) {
            trace_index!(debug, path, "ignoring member");
            return;
        }
        if info.is_dir() {
            self.dirs.entry(path.clone()).or_default();
        }
        let mut dir = parent(&path).to_owned();
        self.place(&dir, DirEntry::new(info.clone(), false));
        *self.copies.entry(path.clone()).or_default() += 1;
        self.contents.insert(path, info);

        while dir != "." {
            let up = parent(&dir).to_owned();
            let implicit = DirEntry::new(EntryInfo::implicit_dir(&dir), true);
            if self.place(&up, implicit) {
                // Everything above was recorded when this directory was.
                break;
            }
            dir = up;
        }
    }

    /// Sorted insert into the listing of `dir`. A stored member replaces an
    /// existing child of the same name; an implicit one never does. Returns
    /// `true` when a child of that name was already present.
    fn place(&mut self, dir: &str, child: DirEntry) -> bool {
        let children = self.dirs.entry(dir.to_owned()).or_default();
        match children.binary_search_by(|existing| existing.name().cmp(child.name())) {
            Ok(found) => {
                if !child.is_implicit() {
                    children[found] = child;
                }
                true
            }
            Err(slot) => {
                children.insert(slot, child);
                false
            }
        }
    }

    /// Metadata for `path`, synthesising a directory when only descendants
    /// were stored.
    pub(crate) fn stat(&self, path: &str) -> Option<EntryInfo> {
        self.contents.get(path).cloned().or_else(|| {
            self.dirs
                .contains_key(path)
                .then(|| EntryInfo::implicit_dir(path))
        })
    }

    /// Children of directory `path`.
    pub(crate) fn list(&self, path: &str) -> Option<&[DirEntry]> {
        self.dirs.get(path).map(Vec::as_slice)
    }

    /// Returns `true` when `path` is a stored non-directory.
    pub(crate) fn is_non_dir(&self, path: &str) -> bool {
        self.contents.get(path).is_some_and(|info| !info.is_dir())
    }

    /// How many times `path` was stored.
    pub(crate) fn copies(&self, path: &str) -> usize {
        self.copies.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn len(&self) -> usize {
        self.contents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(index: &Index, dir: &str) -> Vec<String> {
        index
            .list(dir)
            .expect("listed")
            .iter()
            .map(|entry| entry.name().to_owned())
            .collect()
    }

    #[test]
    fn implicit_directories_are_synthesised() {
        let mut index = Index::new();
        index.insert(EntryInfo::file("a/b/c", 1));
        assert_eq!(names(&index, "."), ["a"]);
        assert_eq!(names(&index, "a"), ["b"]);
        assert_eq!(names(&index, "a/b"), ["c"]);
        assert!(index.list(".").expect("root")[0].is_implicit());
        assert!(index.stat("a/b").expect("implicit").is_dir());
        assert!(index.stat("a/x").is_none());
    }

    #[test]
    fn the_last_copy_of_a_path_wins() {
        let mut index = Index::new();
        index.insert(EntryInfo::file("a/notes", 3));
        index.insert(EntryInfo::file("a/notes", 5));
        assert_eq!(index.stat("a/notes").expect("stored").size(), 5);
        assert_eq!(index.copies("a/notes"), 2);
        assert_eq!(index.copies("a"), 0);
        let listing = index.list("a").expect("listed");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].info().size(), 5);
    }

    #[test]
    fn stored_directories_replace_implicit_ones() {
        let mut index = Index::new();
        index.insert(EntryInfo::file("a/b", 1));
        index.insert(EntryInfo::dir("a").with_mode(0o700));
        let root = index.list(".").expect("root");
        assert!(!root[0].is_implicit());
        assert_eq!(root[0].info().mode(), 0o700);

        index.insert(EntryInfo::file("a/c/d", 1));
        assert!(!index.list(".").expect("root")[0].is_implicit());
    }

    #[test]
    fn dot_and_escaping_members_are_ignored() {
        let mut index = Index::new();
        index.insert(EntryInfo::dir("."));
        index.insert(EntryInfo::file("../evil", 1));
        index.insert(EntryInfo::file("ok", 1));
        assert_eq!(names(&index, "."), ["ok"]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn listings_are_sorted() {
        let mut index = Index::new();
        for name in ["z", "m/x", "a", "m"] {
            index.insert(EntryInfo::file(name, 0));
        }
        assert_eq!(names(&index, "."), ["a", "m", "z"]);
        assert!(index.is_non_dir("z"));
    }

    proptest! {
        #[test]
        fn every_ancestor_is_listed(paths in proptest::collection::vec("[abc]{1,2}(/[abc]{1,2}){0,3}", 1..16)) {
            let mut index = Index::new();
            for path in &paths {
                index.insert(EntryInfo::file(path, 0));
            }
            for path in &paths {
                let mut child = path.as_str();
                while child != "." {
                    let dir = parent(child);
                    let listing = index.list(dir);
                    prop_assert!(listing.is_some(), "{dir} missing");
                    let name = crate::path::base(child);
                    prop_assert!(listing.unwrap_or_default().iter().any(|e| e.name() == name));
                    child = dir;
                }
            }
        }
    }
}
