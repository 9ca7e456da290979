//! Identification through the built-in registry: stream signatures, name
//! hints, composite detection and robustness against short or odd input.

use std::io::{Cursor, Read};

use archive::{
    ArchiveError, CancelToken, Decompressor, Entry, Extractor, Format, Input, Registry, RewindReader,
    WalkControl, builtin,
};
use compress::{CompressionAlgorithm, CompressionLevel};
use proptest::prelude::*;
use test_support::{Fixture, gzip, tar_bytes, zip_bytes};

const TEXT: &[u8] = b"this is text";

#[test]
fn every_codec_is_found_by_its_stream() {
    for &algorithm in CompressionAlgorithm::available() {
        let compressed = algorithm
            .compress_to_vec(TEXT, CompressionLevel::Default)
            .expect("compress");
        let (format, mut stream) = match builtin().identify("", &compressed[..]) {
            Ok(found) => found,
            Err(ArchiveError::NoMatch) if algorithm.magic().is_none() => {
                // Brotli has no signature; its name is its only hint.
                let hinted = format!("x{}", algorithm.extension());
                let format = builtin().identify_name(&hinted).expect("name hint");
                assert_eq!(format.name(), algorithm.extension());
                continue;
            }
            Err(err) => panic!("{algorithm}: {err}"),
        };
        assert_eq!(format.name(), algorithm.extension(), "{algorithm}");
        let codec = format.as_compression().expect("compression");

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).expect("replay");
        assert_eq!(raw, compressed, "{algorithm} stream was not rewound");

        let mut decoded = Vec::new();
        codec
            .open_reader(Box::new(&raw[..]))
            .expect("decoder")
            .read_to_end(&mut decoded)
            .expect("decode");
        assert_eq!(decoded, TEXT);
    }
}

#[test]
fn plain_text_matches_nothing() {
    assert!(builtin().identify("", TEXT).expect_err("text").is_no_match());
    assert!(builtin().identify("notes.txt", TEXT).expect_err("text").is_no_match());
}

#[test]
fn names_alone_pick_formats() {
    let cases = [
        ("backup.tar.gz", ".tar.gz"),
        ("backup.tar.zst", ".tar.zst"),
        ("bundle.zip", ".zip"),
        ("data.gz", ".gz"),
        ("archive.tar", ".tar"),
    ];
    for (name, expected) in cases {
        let format = builtin().identify_name(name).expect(name);
        assert_eq!(format.name(), expected, "{name}");
    }
    assert!(builtin().identify_name("README").expect_err("none").is_no_match());
    assert!(builtin().identify_name(".").expect_err("dot").is_no_match());
}

#[test]
fn compressed_tar_is_a_composite() {
    let tar = tar_bytes(&[Fixture::file("a.txt", b"alpha")]);
    let (format, _) = builtin().identify("", &gzip(&tar)[..]).expect("identify");
    assert!(matches!(format, Format::CompressedArchive(_)));
    assert_eq!(format.name(), ".tar.gz");
    assert!(format.is_archive());
}

#[test]
fn compressed_text_falls_back_to_the_codec() {
    let (format, _) = builtin().identify("", &gzip(TEXT)[..]).expect("identify");
    assert_eq!(format.name(), ".gz");
    assert!(!format.is_archive());
}

#[test]
fn stream_signature_beats_a_misleading_name() {
    let zip = zip_bytes(&[Fixture::file("a.txt", b"alpha")]);
    let (format, _) = builtin().identify("report.tar", &zip[..]).expect("identify");
    assert_eq!(format.name(), ".zip");
}

#[test]
fn names_never_override_readable_content() {
    let tar = tar_bytes(&[Fixture::file("a.txt", b"alpha")]);
    let (format, _) = builtin().identify("backup.tar.gz", &tar[..]).expect("plain tar");
    assert_eq!(format.name(), ".tar");

    let zip = zip_bytes(&[Fixture::file("a.txt", b"alpha")]);
    let (format, _) = builtin().identify("report.gz", &zip[..]).expect("zip");
    assert_eq!(format.name(), ".zip");

    let (format, _) = builtin().identify("data.tar", &gzip(TEXT)[..]).expect("gzipped text");
    assert_eq!(format.name(), ".gz");
    assert!(!format.is_archive());
}

#[test]
fn misnamed_archives_still_extract() {
    let tar = tar_bytes(&[Fixture::file("a.txt", b"alpha")]);
    let (format, stream) = builtin().identify("backup.tar.gz", &tar[..]).expect("identify");
    let mut seen = Vec::new();
    format
        .extractor()
        .expect("archive")
        .extract(
            &CancelToken::new(),
            Input::stream(stream),
            None,
            &mut |entry: &mut Entry<'_>| {
                seen.push(entry.path().to_owned());
                Ok(WalkControl::Continue)
            },
        )
        .expect("extract");
    assert_eq!(seen, ["a.txt"]);
}

#[test]
fn unreadable_content_falls_back_to_the_name() {
    let (format, _) = builtin().identify("backup.tar.gz", &b""[..]).expect("empty");
    assert_eq!(format.name(), ".tar.gz");
    let (format, _) = builtin().identify("notes.gz", TEXT).expect("plain text");
    assert_eq!(format.name(), ".gz");
}

#[test]
fn identification_is_idempotent() {
    let tar = tar_bytes(&[Fixture::dir("d"), Fixture::file("d/f", b"x")]);
    let mut reader = RewindReader::new(&tar[..]);
    let first = builtin()
        .identify_rewind("", Some(&mut reader))
        .expect("first");
    let second = builtin()
        .identify_rewind("", Some(&mut reader))
        .expect("second");
    assert_eq!(first.name(), second.name());

    let mut rest = Vec::new();
    reader.into_reader().read_to_end(&mut rest).expect("read");
    assert_eq!(rest, tar);
}

#[test]
fn seekable_identification_restores_the_position() {
    let zip = zip_bytes(&[Fixture::file("a", b"a")]);
    let mut cursor = Cursor::new(zip);
    cursor.set_position(0);
    let format = builtin()
        .identify_seekable("", &mut cursor)
        .expect("identify");
    assert_eq!(format.name(), ".zip");
    assert_eq!(cursor.position(), 0);
}

#[test]
fn empty_registry_matches_nothing() {
    let registry = Registry::new();
    assert!(registry.identify("a.tar", &b""[..]).expect_err("empty").is_no_match());
}

proptest! {
    #[test]
    fn short_inputs_never_fail_hard(bytes in proptest::collection::vec(any::<u8>(), 0..24)) {
        match builtin().identify("", &bytes[..]) {
            Ok((_, mut stream)) => {
                let mut replay = Vec::new();
                stream.read_to_end(&mut replay).expect("replay");
                prop_assert_eq!(replay, bytes);
            }
            Err(err) => prop_assert!(err.is_no_match(), "unexpected {}", err),
        }
    }
}

#[test]
fn trimmed_headers_do_not_match() {
    for &algorithm in CompressionAlgorithm::available() {
        let Some(magic) = algorithm.magic() else {
            continue;
        };
        let compressed = algorithm
            .compress_to_vec(TEXT, CompressionLevel::Default)
            .expect("compress");
        let trimmed = &compressed[..magic.len() - 1];
        let err = builtin().identify("", trimmed).expect_err("trimmed header");
        assert!(err.is_no_match(), "{algorithm}: {err}");
    }
}
