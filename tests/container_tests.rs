//! Tests for the container codec.
//!
//! Validates the artifact wire format, positional manifest mapping, and
//! rejection of malformed artifacts.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use vortex::container::{compress, decompress};
use vortex::{Container, Error, FORMAT_VERSION, Manifest};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn asset(path: &str, data: &[u8]) -> (String, Arc<[u8]>) {
    (path.to_string(), Arc::from(data))
}

fn archive_names(artifact: &[u8]) -> Vec<String> {
    let archive = decompress(artifact).unwrap();
    let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort_by_key(|n| n.parse::<usize>().unwrap_or(usize::MAX));
    names
}

fn raw_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    compress(&writer.finish().unwrap().into_inner()).unwrap()
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_roundtrip_without_assets() {
    let container = Container::new(b"console.log(1);".to_vec(), Vec::new());
    let decoded = Container::decode(&container.encode().unwrap()).unwrap();

    assert_eq!(decoded.bundle, b"console.log(1);");
    assert!(decoded.assets.is_empty());
    assert_eq!(decoded.manifest.version(), FORMAT_VERSION);
    assert!(decoded.manifest.paths().is_empty());
}

#[test]
fn test_roundtrip_single_asset() {
    let container = Container::new(b"bundle".to_vec(), vec![asset("/assets/logo.png", b"PNG")]);
    let decoded = Container::decode(&container.encode().unwrap()).unwrap();

    assert_eq!(decoded.bundle, b"bundle");
    assert_eq!(decoded.assets, container.assets);
}

#[test]
fn test_roundtrip_many_assets_keeps_order() {
    let assets = vec![
        asset("/z/last.bin", &[0u8, 1, 2, 255]),
        asset("/a/first.txt", b"first"),
        asset("/m/empty.dat", b""),
        asset("/audio/theme.ogg", &[7u8; 4096]),
    ];
    let container = Container::new(b"code".to_vec(), assets.clone());
    let decoded = Container::decode(&container.encode().unwrap()).unwrap();

    assert_eq!(decoded.assets, assets);
    let paths: Vec<&str> = decoded.manifest.paths().iter().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["/z/last.bin", "/a/first.txt", "/m/empty.dat", "/audio/theme.ogg"]
    );
}

#[test]
fn test_decoded_vfs_holds_assets() {
    let container = Container::new(
        b"code".to_vec(),
        vec![asset("/img/a.png", b"a"), asset("/img/b.png", b"b")],
    );
    let vfs = Container::decode(&container.encode().unwrap())
        .unwrap()
        .to_vfs();

    assert_eq!(vfs.len(), 2);
    assert_eq!(&vfs.read_file("/img/b.png").unwrap()[..], b"b");
}

// =============================================================================
// Wire Format Tests
// =============================================================================

#[test]
fn test_archive_keys_are_positional() {
    let container = Container::new(
        b"code".to_vec(),
        vec![asset("/a.png", b"a"), asset("/b.png", b"b")],
    );
    let artifact = container.encode().unwrap();

    assert_eq!(archive_names(&artifact), vec!["0", "1", "2", "3"]);
}

#[test]
fn test_archive_without_assets_has_structural_keys_only() {
    let artifact = Container::new(b"code".to_vec(), Vec::new()).encode().unwrap();
    assert_eq!(archive_names(&artifact), vec!["0", "1"]);
}

#[test]
fn test_archive_entries_are_stored() {
    let container = Container::new(vec![b'x'; 10_000], vec![asset("/a.txt", &[b'y'; 10_000])]);
    let archive = container.to_archive().unwrap();
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();

    for i in 0..zip.len() {
        let file = zip.by_index(i).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Stored);
    }
}

#[test]
fn test_manifest_entry_is_delimited_text() {
    let container = Container::new(b"code".to_vec(), vec![asset("/a.png", b"a")]);
    let archive = decompress(&container.encode().unwrap()).unwrap();
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();

    let mut manifest = String::new();
    zip.by_name("0")
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    assert_eq!(manifest, format!("{}|/a.png", FORMAT_VERSION));
}

#[test]
fn test_manifest_key_mapping() {
    let manifest = Manifest::new(vec!["/a".to_string(), "/b".to_string()]);
    assert_eq!(manifest.path_for_key(0), None);
    assert_eq!(manifest.path_for_key(1), None);
    assert_eq!(manifest.path_for_key(2), Some("/a"));
    assert_eq!(manifest.path_for_key(3), Some("/b"));
    assert_eq!(manifest.path_for_key(4), None);
}

#[test]
fn test_delimiter_in_path_is_not_defended() {
    // Known constraint: a path containing '|' splits into two manifest
    // elements and shifts every later asset.
    let container = Container::new(
        b"code".to_vec(),
        vec![asset("/odd|name.png", b"odd"), asset("/next.png", b"next")],
    );
    let decoded = Container::decode(&container.encode().unwrap()).unwrap();

    assert_eq!(decoded.manifest.paths().len(), 3);
    assert_ne!(decoded.assets, container.assets);
}

// =============================================================================
// Malformed Artifact Tests
// =============================================================================

#[test]
fn test_decode_rejects_non_zlib_input() {
    let result = Container::decode(b"definitely not an artifact");
    assert!(matches!(result, Err(Error::Compression(_))));
}

#[test]
fn test_decode_rejects_non_archive_payload() {
    let artifact = compress(b"plain text, no archive").unwrap();
    let result = Container::decode(&artifact);
    assert!(matches!(result, Err(Error::InvalidArchive(_))));
}

#[test]
fn test_decode_requires_manifest() {
    let artifact = raw_archive(&[("1", "code")]);
    let result = Container::decode(&artifact);
    assert!(matches!(result, Err(Error::InvalidManifest(_))));
}

#[test]
fn test_decode_requires_bundle() {
    let artifact = raw_archive(&[("0", "1.0.0")]);
    let result = Container::decode(&artifact);
    assert!(matches!(result, Err(Error::InvalidArchive(_))));
}

#[test]
fn test_decode_rejects_empty_version() {
    let artifact = raw_archive(&[("0", "|/a.png"), ("1", "code"), ("2", "a")]);
    let result = Container::decode(&artifact);
    assert!(matches!(result, Err(Error::InvalidManifest(_))));
}

#[test]
fn test_decode_skips_unknown_entries() {
    let artifact = raw_archive(&[
        ("0", "1.0.0|/a.png"),
        ("1", "code"),
        ("2", "a"),
        ("9", "orphan"),
        ("readme", "junk"),
    ]);
    let decoded = Container::decode(&artifact).unwrap();

    assert_eq!(decoded.assets.len(), 1);
    assert_eq!(decoded.assets[0].0, "/a.png");
}

#[test]
fn test_decode_orders_assets_by_key_not_archive_order() {
    let artifact = raw_archive(&[
        ("3", "second"),
        ("1", "code"),
        ("2", "first"),
        ("0", "1.0.0|/first.txt|/second.txt"),
    ]);
    let decoded = Container::decode(&artifact).unwrap();

    let paths: Vec<&str> = decoded.assets.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["/first.txt", "/second.txt"]);
    assert_eq!(&decoded.assets[1].1[..], b"second");
}
