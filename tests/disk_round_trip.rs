//! Files collected from disk survive a trip through every writable format
//! and back onto disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use archives::compress::CompressionAlgorithm;
use archives::{
    Archiver, CancelToken, Codec, CompressedArchive, Extractor, FileSystem, FromDiskOptions, Input,
    Matcher, Tar, Zip, builtin, extract_to_dir, file_system, files_from_disk,
};
use test_support::{Fixture, temp_tree};

fn source_tree() -> tempfile::TempDir {
    temp_tree(&[
        Fixture::file("src/lib.rs", b"pub fn answer() -> u32 { 42 }\n"),
        Fixture::file_with_mode("bin/run", b"#!/bin/sh\nexit 0\n", 0o755),
        Fixture::file("README.md", b"# project\n"),
    ])
}

fn assert_same_tree(expected: &Path, actual: &Path) {
    for relative in ["src/lib.rs", "bin/run", "README.md"] {
        assert_eq!(
            fs::read(expected.join(relative)).expect("expected"),
            fs::read(actual.join(relative)).expect(relative),
            "{relative}"
        );
    }
}

fn round_trip<F: Extractor + Archiver>(format: &F, file_name: &str) {
    let source = source_tree();
    let files = files_from_disk(&FromDiskOptions::default(), &[(source.path(), "")]).expect("collect");

    let work = tempfile::tempdir().expect("tempdir");
    let archive_path = work.path().join(file_name);
    let mut out = fs::File::create(&archive_path).expect("create");
    format
        .archive(&CancelToken::new(), &mut out, &files)
        .expect("archive");
    drop(out);

    let view = file_system(builtin(), &archive_path).expect("browse");
    let mut root: Vec<_> = view
        .read_dir(".")
        .expect("list")
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect();
    root.sort();
    assert_eq!(root, ["README.md", "bin", "src"]);

    let dest = work.path().join("out");
    let written = extract_to_dir(
        format,
        &CancelToken::new(),
        Input::seekable(fs::File::open(&archive_path).expect("open")),
        &dest,
    )
    .expect("extract");
    assert_eq!(written, files.len());
    assert_same_tree(source.path(), &dest);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dest.join("bin/run")).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn tar_round_trip_through_disk() {
    round_trip(&Tar::new(), "project.tar");
}

#[test]
fn zip_round_trip_through_disk() {
    round_trip(&Zip::new(), "project.zip");
}

#[test]
fn compressed_tar_round_trip_through_disk() {
    for algorithm in CompressionAlgorithm::available() {
        let composite = CompressedArchive::new(Arc::new(Codec::new(*algorithm)), Arc::new(Tar::new()));
        let name = format!("project{}", Matcher::name(&composite));
        round_trip(&composite, &name);
    }
}
