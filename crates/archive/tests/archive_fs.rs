//! Browsing archives through the file system views.

use std::fs;
use std::io::Read;

use archive::{
    ArchiveError, ArchiveFs, CancelToken, FileSystem, builtin, file_system,
};
use test_support::{Fixture, gzip, tar_bytes, zip_bytes};

fn fixtures() -> Vec<Fixture> {
    vec![
        Fixture::file("top/docs/readme.txt", b"read me"),
        Fixture::file("top/a.txt", b"alpha"),
        Fixture::dir("top/empty"),
        Fixture::file("top/big.bin", vec![7u8; 200 * 1024]),
    ]
}

fn tar_fs() -> ArchiveFs {
    let tar = builtin().lookup(".tar").expect("tar");
    ArchiveFs::from_bytes(tar_bytes(&fixtures()), tar).expect("view")
}

fn names(fs: &dyn FileSystem, dir: &str) -> Vec<String> {
    fs.read_dir(dir)
        .expect(dir)
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect()
}

fn read(fs: &dyn FileSystem, name: &str) -> String {
    let mut file = fs.open(name).expect(name);
    let mut text = String::new();
    file.read_to_string(&mut text).expect("read");
    file.close().expect("close");
    text
}

#[test]
fn stat_and_open_work_before_any_index() {
    let fs = tar_fs();
    assert_eq!(fs.stat("top/a.txt").expect("stat").size(), 5);
    let docs = fs.stat("top/docs").expect("implicit dir");
    assert!(docs.is_dir());
    assert!(fs.stat("top/nope").expect_err("missing").is_not_found());
    assert_eq!(read(&fs, "top/docs/readme.txt"), "read me");

    let mut dir = fs.open("top/docs").expect("open dir");
    assert!(dir.info().is_dir());
    let listing = dir.read_dir(None).expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name(), "readme.txt");
}

#[test]
fn listings_include_implicit_directories() {
    let fs = tar_fs();
    let root = fs.read_dir(".").expect("root");
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].name(), "top");
    assert!(root[0].is_implicit());
    assert!(root[0].is_dir());

    assert_eq!(names(&fs, "top"), ["a.txt", "big.bin", "docs", "empty"]);
    assert!(names(&fs, "top/empty").is_empty());
    assert!(matches!(
        fs.read_dir("top/a.txt"),
        Err(ArchiveError::NotADirectory { .. })
    ));
    assert!(fs.read_dir("top/missing").expect_err("missing").is_not_found());

    // Served from the index from here on.
    assert_eq!(read(&fs, "top/a.txt"), "alpha");
    assert!(fs.open("top/missing").expect_err("missing").is_not_found());
}

#[test]
fn root_is_a_directory() {
    let fs = tar_fs();
    assert!(fs.stat(".").expect("root").is_dir());
    let mut root = fs.open(".").expect("open root");
    assert_eq!(root.read_dir(Some(10)).expect("list").len(), 1);
}

#[test]
fn invalid_names_are_rejected() {
    let fs = tar_fs();
    for name in ["../x", "/top", "top/", "top//a.txt", "", "./top"] {
        assert!(
            matches!(fs.stat(name), Err(ArchiveError::InvalidPath { .. })),
            "{name:?}"
        );
    }
}

#[test]
fn sub_views_share_the_archive() {
    let fs = tar_fs();
    let top = fs.sub("top").expect("sub");
    assert_eq!(names(top.as_ref(), "."), ["a.txt", "big.bin", "docs", "empty"]);
    assert_eq!(read(top.as_ref(), "docs/readme.txt"), "read me");
    let docs = top.sub("docs").expect("nested sub");
    assert_eq!(names(docs.as_ref(), "."), ["readme.txt"]);
    assert!(matches!(
        fs.sub("top/a.txt"),
        Err(ArchiveError::NotADirectory { .. })
    ));
}

#[test]
fn top_dir_variants_strip_one_element() {
    let zip = builtin().lookup(".zip").expect("zip");
    let fs = ArchiveFs::from_bytes(zip_bytes(&[Fixture::file("a.txt", b"alpha")]), zip).expect("view");
    assert_eq!(fs.top_dir_stat("project/a.txt").expect("stat").size(), 5);
    let mut text = String::new();
    fs.top_dir_open("project/a.txt")
        .expect("open")
        .read_to_string(&mut text)
        .expect("read");
    assert_eq!(text, "alpha");
    assert_eq!(fs.top_dir_read_dir(".").expect("list").len(), 1);
    assert!(fs.top_dir_stat("project/b.txt").is_err());
}

#[test]
fn dropping_a_half_read_file_releases_the_worker() {
    let fs = tar_fs();
    let mut file = fs.open("top/big.bin").expect("open");
    let mut head = [0u8; 16];
    file.read_exact(&mut head).expect("read");
    assert_eq!(head, [7u8; 16]);
    drop(file);

    let mut whole = Vec::new();
    fs.open("top/big.bin")
        .expect("reopen")
        .read_to_end(&mut whole)
        .expect("read");
    assert_eq!(whole.len(), 200 * 1024);
}

#[test]
fn a_failed_index_build_is_not_cached() {
    let fs = tar_fs();
    let cancel = CancelToken::new();
    cancel.cancel();
    let cancelled = fs.clone().with_cancel(cancel);
    assert!(cancelled.read_dir(".").expect_err("cancelled").is_cancelled());
    assert_eq!(names(&fs, "top/docs"), ["readme.txt"]);
}

#[test]
fn an_index_build_failing_partway_is_retried() {
    let members = [
        Fixture::file("a.txt", b"alpha"),
        Fixture::file("b.txt", b"bravo"),
        Fixture::file("c.txt", b"charlie"),
    ];
    let good = tar_bytes(&members);
    let mut corrupt = good.clone();
    // Third header; each earlier member is one header block and one data block.
    corrupt[2048..2560].fill(b'x');

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("update.tar");
    fs::write(&path, &corrupt).expect("write");
    let tar = builtin().lookup(".tar").expect("tar");
    let view = ArchiveFs::open_path(&path, tar).expect("view");

    assert!(view.read_dir(".").is_err());
    assert!(view.read_dir(".").is_err(), "a failed walk must not be cached");

    fs::write(&path, &good).expect("repair");
    assert_eq!(names(&view, "."), ["a.txt", "b.txt", "c.txt"]);
}

#[test]
fn appended_copies_replace_earlier_ones() {
    let tar = builtin().lookup(".tar").expect("tar");
    let archive = tar_bytes(&[
        Fixture::file("notes.txt", b"old"),
        Fixture::file("other.txt", b"x"),
        Fixture::file("notes.txt", b"newer"),
    ]);

    let fresh = ArchiveFs::from_bytes(archive.clone(), tar).expect("view");
    assert_eq!(fresh.stat("notes.txt").expect("stat").size(), 5);
    assert_eq!(read(&fresh, "notes.txt"), "newer");

    let indexed = ArchiveFs::from_bytes(archive, tar).expect("view");
    let listing = indexed.read_dir(".").expect("list");
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].info().size(), 5);
    assert_eq!(indexed.stat("notes.txt").expect("stat").size(), 5);
    assert_eq!(read(&indexed, "notes.txt"), "newer");
}

#[test]
fn file_system_picks_a_view() {
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = dir.path().join("bundle.tar.gz");
    fs::write(&archive, gzip(&tar_bytes(&fixtures()))).expect("write");
    let compressed = dir.path().join("notes.txt.gz");
    fs::write(&compressed, gzip(b"unpacked")).expect("write");
    let plain = dir.path().join("plain.txt");
    fs::write(&plain, b"as is").expect("write");

    let view = file_system(builtin(), &archive).expect("archive view");
    assert_eq!(read(view.as_ref(), "top/a.txt"), "alpha");

    let view = file_system(builtin(), &compressed).expect("codec view");
    assert_eq!(read(view.as_ref(), "notes.txt.gz"), "unpacked");

    let view = file_system(builtin(), &plain).expect("file view");
    assert_eq!(names(view.as_ref(), "."), ["plain.txt"]);

    let view = file_system(builtin(), dir.path()).expect("dir view");
    assert_eq!(
        names(view.as_ref(), "."),
        ["bundle.tar.gz", "notes.txt.gz", "plain.txt"]
    );
}

#[test]
fn compression_only_formats_cannot_be_browsed() {
    let gz = builtin().lookup(".gz").expect("gz");
    assert!(matches!(
        ArchiveFs::from_bytes(gzip(b"x"), gz),
        Err(ArchiveError::Unsupported { .. })
    ));
}
