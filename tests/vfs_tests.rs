//! Tests for the virtual filesystem.
//!
//! Validates normalization, import resolution, lookups and loading a
//! project tree from disk.

use std::fs;
use tempfile::TempDir;
use vortex::{Error, Vfs};

// =============================================================================
// Normalization Tests
// =============================================================================

#[test]
fn test_normalize_collapses_parent_segments() {
    assert_eq!(Vfs::normalize("a/b/../c"), "/a/c");
    assert_eq!(Vfs::normalize("/a/./b//c/"), "/a/b/c");
}

#[test]
fn test_normalize_clamps_at_root() {
    assert_eq!(Vfs::normalize("../../x"), "/x");
    assert_eq!(Vfs::normalize("/.."), "/");
    assert_eq!(Vfs::normalize(""), "/");
}

#[test]
fn test_normalize_treats_backslash_as_separator() {
    assert_eq!(Vfs::normalize("a\\b\\..\\c"), Vfs::normalize("a/b/../c"));
    assert_eq!(Vfs::normalize("scripts\\util/./x.ts"), "/scripts/util/x.ts");
}

#[test]
fn test_normalize_is_idempotent() {
    let inputs = [
        "a/b/../c",
        "../../x",
        "/scripts/./main.ts",
        "x\\y\\..\\z",
        "//double//slash//",
        "",
        "/",
        "a/../../..",
    ];
    for input in inputs {
        let once = Vfs::normalize(input);
        assert_eq!(Vfs::normalize(&once), once, "not idempotent for {:?}", input);
    }
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[test]
fn test_resolve_absolute_ignores_importer() {
    assert_eq!(
        Vfs::resolve("/lib/engine.js", Some("/scripts/main.ts")),
        "/lib/engine.js"
    );
}

#[test]
fn test_resolve_relative_to_importer_directory() {
    assert_eq!(
        Vfs::resolve("./util.ts", Some("/scripts/main.ts")),
        "/scripts/util.ts"
    );
    assert_eq!(
        Vfs::resolve("../shared/math.ts", Some("/scripts/game/main.ts")),
        "/scripts/shared/math.ts"
    );
}

#[test]
fn test_resolve_without_importer_uses_root() {
    assert_eq!(Vfs::resolve("scripts/main.ts", None), "/scripts/main.ts");
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_lookup_uses_normalized_form() {
    let vfs = Vfs::from_iter([("scripts/main.ts", "main")]);

    assert!(vfs.exists("/scripts/main.ts"));
    assert!(vfs.exists("scripts/./main.ts"));
    assert!(vfs.exists("\\scripts\\main.ts"));
    assert_eq!(&vfs.read_file("/x/../scripts/main.ts").unwrap()[..], b"main");
}

#[test]
fn test_read_missing_file() {
    let vfs = Vfs::new();
    let err = vfs.read_file("/nope.txt").unwrap_err();
    assert!(matches!(err, Error::FileNotFound { ref path } if path == "/nope.txt"));
}

#[test]
fn test_iteration_preserves_insertion_order() {
    let vfs = Vfs::from_iter([("/z.txt", "z"), ("/a.txt", "a"), ("/m.txt", "m")]);
    let paths: Vec<&str> = vfs.iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec!["/z.txt", "/a.txt", "/m.txt"]);
}

// =============================================================================
// Disk Loading Tests
// =============================================================================

#[test]
fn test_from_dir_loads_tree_sorted() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("scripts")).unwrap();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("vortex.json"), "{}").unwrap();
    fs::write(root.join("scripts").join("main.ts"), "main").unwrap();
    fs::write(root.join("assets").join("b.png"), "b").unwrap();
    fs::write(root.join("assets").join("a.png"), "a").unwrap();

    let vfs = Vfs::from_dir(root).unwrap();

    let paths: Vec<&str> = vfs.iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        vec![
            "/assets/a.png",
            "/assets/b.png",
            "/scripts/main.ts",
            "/vortex.json"
        ]
    );
    assert_eq!(&vfs.read_file("/scripts/main.ts").unwrap()[..], b"main");
}

#[test]
fn test_from_dir_missing_root() {
    let temp = TempDir::new().unwrap();
    let result = Vfs::from_dir(&temp.path().join("missing"));
    assert!(matches!(result, Err(Error::Io(_))));
}
