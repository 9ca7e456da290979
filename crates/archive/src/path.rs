//! Helpers for the `/`-separated paths used inside archives.
//!
//! Archive paths are relative, use `/` on every platform and never end with a
//! separator. The root of an archive is spelled `"."`.

use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

/// Returns `true` when `name` is acceptable to a [`FileSystem`](crate::fs::FileSystem).
///
/// Valid names are `"."` or a sequence of non-empty elements separated by
/// single slashes, none of which is `.` or `..`. Leading and trailing slashes
/// are rejected.
#[must_use]
pub fn valid_path(name: &str) -> bool {
    if name == "." {
        return true;
    }
    !name.is_empty()
        && name
            .split('/')
            .all(|element| !element.is_empty() && element != "." && element != "..")
}

/// Canonical form of a path as stored in an archive.
///
/// Leading slashes, empty elements and `.` elements are dropped. `..` is kept
/// so that escaping paths stay detectable. An empty result becomes `"."`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|element| !element.is_empty() && *element != ".")
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

/// Directory containing `path`; `"."` for top-level names and the root.
#[must_use]
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => ".",
    }
}

/// Last element of `path`.
#[must_use]
pub fn base(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

/// Joins two archive paths, treating `"."` as the identity.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    match (dir, name) {
        (".", _) => name.to_owned(),
        (_, ".") => dir.to_owned(),
        _ => format!("{dir}/{name}"),
    }
}

/// Returns `true` when `path` equals `dir` or lies beneath it.
///
/// The match respects element boundaries: `"a"` contains `"a/b"` but not
/// `"ab"`. Every path lies within `"."`.
#[must_use]
pub fn is_within(path: &str, dir: &str) -> bool {
    dir == "."
        || path == dir
        || (path.len() > dir.len()
            && path.starts_with(dir)
            && path.as_bytes()[dir.len()] == b'/')
}

/// Applies an extraction path filter.
///
/// `None` admits everything, an empty list admits nothing, otherwise a path
/// is admitted when it equals or descends from one of the listed paths.
#[must_use]
pub fn path_included(paths: Option<&[String]>, candidate: &str) -> bool {
    paths.is_none_or(|list| {
        list.iter()
            .any(|wanted| is_within(candidate, wanted.trim_end_matches('/')))
    })
}

/// Drops the first element of `path`, or returns `None` when there is only
/// one element.
#[must_use]
pub fn strip_first_component(path: &str) -> Option<&str> {
    path.split_once('/').map(|(_, rest)| rest)
}

/// Resolves an archive entry path beneath `root`.
///
/// Both `/` and `\` count as separators and leading separators are ignored.
/// A `..` that would climb above `root`, or a drive prefix such as `C:`, is
/// rejected with [`ArchiveError::ZipSlip`] before any file is touched.
pub fn safe_join(root: &Path, entry: &str) -> Result<PathBuf, ArchiveError> {
    let slip = || ArchiveError::ZipSlip {
        path: entry.to_owned(),
    };
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for (index, element) in entry.split(['/', '\\']).enumerate() {
        match element {
            "" | "." => {}
            ".." => {
                if depth == 0 {
                    return Err(slip());
                }
                depth -= 1;
                resolved.pop();
            }
            _ if index == 0 && element.len() == 2 && element.ends_with(':') => {
                return Err(slip());
            }
            _ => {
                depth += 1;
                resolved.push(element);
            }
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_path_grammar() {
        assert!(valid_path("."));
        assert!(valid_path("a/b.txt"));
        for bad in ["", "/a", "a/", "a//b", "./a", "a/./b", "../a", "a/.."] {
            assert!(!valid_path(bad), "{bad:?} accepted");
        }
    }

    #[test]
    fn normalize_trims_archive_noise() {
        assert_eq!(normalize("./a//b/"), "a/b");
        assert_eq!(normalize("/abs/path"), "abs/path");
        assert_eq!(normalize("./"), ".");
        assert_eq!(normalize("a/../b"), "a/../b");
    }

    #[test]
    fn filter_respects_element_boundaries() {
        let filter = vec!["a".to_owned()];
        assert!(path_included(Some(&filter), "a"));
        assert!(path_included(Some(&filter), "a/b/c"));
        assert!(!path_included(Some(&filter), "ab/c"));
        assert!(!path_included(Some(&[]), "a"));
        assert!(path_included(None, "anything"));
    }

    #[test]
    fn parent_and_base() {
        assert_eq!(parent("a/b/c"), "a/b");
        assert_eq!(parent("a"), ".");
        assert_eq!(base("a/b/c"), "c");
        assert_eq!(join(".", "x"), "x");
        assert_eq!(join("a", "x"), "a/x");
        assert_eq!(strip_first_component("top/b/c"), Some("b/c"));
        assert_eq!(strip_first_component("top"), None);
    }

    #[test]
    fn safe_join_rejects_escapes() {
        let root = Path::new("/dest");
        assert_eq!(
            safe_join(root, "a/b/../c").expect("inside"),
            PathBuf::from("/dest/a/c")
        );
        assert_eq!(
            safe_join(root, "/etc/passwd").expect("rooted"),
            PathBuf::from("/dest/etc/passwd")
        );
        for hostile in ["../x", "a/../../x", "..\\..\\x", "C:/windows", "c:"] {
            assert!(
                matches!(safe_join(root, hostile), Err(ArchiveError::ZipSlip { .. })),
                "{hostile:?} accepted"
            );
        }
    }

    proptest! {
        #[test]
        fn normalized_paths_without_dotdot_are_valid(
            elements in proptest::collection::vec("[a-z.]{0,4}", 0..6)
        ) {
            let raw = elements.join("/");
            let normalized = normalize(&raw);
            prop_assume!(!normalized.split('/').any(|e| e == ".."));
            prop_assert!(valid_path(&normalized), "{raw:?} -> {normalized:?}");
        }

        #[test]
        fn a_sibling_with_a_longer_name_is_never_included(
            dir in "[a-z]{1,6}",
            suffix in "[a-z]{1,3}",
            rest in "[a-z]{1,6}",
        ) {
            let filter = vec![dir.clone()];
            let sibling = format!("{dir}{suffix}/{rest}");
            prop_assert!(!path_included(Some(&filter), &sibling));
            let child = format!("{dir}/{rest}");
            prop_assert!(path_included(Some(&filter), &child));
        }
    }
}
