//! Tests for namespaced storage.
//!
//! Validates key derivation, namespace isolation, value encoding, and the
//! file-backed store's persistence and atomic writes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use vortex::storage::derive_key;
use vortex::{FileStore, KeyValueStore, MemoryStore, ScopedStorage};

// =============================================================================
// Key Derivation Tests
// =============================================================================

#[test]
fn test_derive_key_is_deterministic() {
    assert_eq!(
        derive_key("1.0.0", "Space Race", "best"),
        derive_key("1.0.0", "Space Race", "best")
    );
}

#[test]
fn test_derive_key_layout() {
    let key = derive_key("1.0.0", "Space Race", "best");
    let parts: Vec<&str> = key.splitn(4, '-').collect();

    assert_eq!(parts[0], "Vortex");
    assert_eq!(parts[1], "1.0.0");
    assert_eq!(BASE64.decode(parts[2]).unwrap(), b"SpaceRace");
    assert_eq!(BASE64.decode(parts[3]).unwrap(), b"best");
}

#[test]
fn test_derive_key_separates_versions_and_games() {
    let base = derive_key("1.0.0", "Alpha", "score");
    assert_ne!(base, derive_key("1.0.1", "Alpha", "score"));
    assert_ne!(base, derive_key("1.0.0", "Beta", "score"));
    assert_ne!(base, derive_key("1.0.0", "Alpha", "lives"));
}

#[test]
fn test_derive_key_ignores_spaces_in_game_name() {
    assert_eq!(
        derive_key("1.0.0", "Foo Bar", "k"),
        derive_key("1.0.0", "FooBar", "k")
    );
}

// =============================================================================
// Scoped Storage Tests
// =============================================================================

#[test]
fn test_values_stored_base64_encoded() {
    let backend = Arc::new(MemoryStore::new());
    let storage = ScopedStorage::new(backend.clone(), "1.0.0", "Alpha");

    storage.set("motto", "to the stars").unwrap();

    let raw = backend
        .get(&derive_key("1.0.0", "Alpha", "motto"))
        .unwrap()
        .unwrap();
    assert_eq!(raw, BASE64.encode("to the stars"));
}

#[test]
fn test_missing_and_empty_values() {
    let storage = ScopedStorage::new(Arc::new(MemoryStore::new()), "1.0.0", "Alpha");

    assert_eq!(storage.get("never").unwrap(), None);
    assert!(!storage.has("never").unwrap());

    storage.set("blank", "").unwrap();
    assert_eq!(storage.get("blank").unwrap(), None);
    assert!(storage.has("blank").unwrap());
}

#[test]
fn test_unicode_values_roundtrip() {
    let storage = ScopedStorage::new(Arc::new(MemoryStore::new()), "1.0.0", "Alpha");
    storage.set("name", "Zoë 🚀").unwrap();
    assert_eq!(storage.get("name").unwrap().as_deref(), Some("Zoë 🚀"));
}

#[test]
fn test_corrupt_backend_value_is_reported() {
    let backend = Arc::new(MemoryStore::new());
    backend
        .set(&derive_key("1.0.0", "Alpha", "bad"), "%%% not base64 %%%")
        .unwrap();
    let storage = ScopedStorage::new(backend, "1.0.0", "Alpha");

    assert!(storage.get("bad").is_err());
}

#[test]
fn test_renaming_game_rescopes_clones() {
    let storage = ScopedStorage::new(Arc::new(MemoryStore::new()), "1.0.0", "Untitled Game");
    let handle = storage.clone();

    storage.set("k", "before").unwrap();
    storage.set_game_name("Alpha").unwrap();

    assert_eq!(handle.game_name().unwrap(), "Alpha");
    assert_eq!(handle.get("k").unwrap(), None);
    handle.set("k", "after").unwrap();
    assert_eq!(storage.get("k").unwrap().as_deref(), Some("after"));
}

// =============================================================================
// File Store Tests
// =============================================================================

#[test]
fn test_file_store_creates_parent_dirs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("deeply").join("nested").join("storage.json");

    let store = FileStore::with_path(path.clone()).unwrap();

    assert!(path.parent().unwrap().exists());
    assert_eq!(store.path(), path.as_path());
}

#[test]
fn test_file_store_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("storage.json");

    {
        let store = Arc::new(FileStore::with_path(path.clone()).unwrap());
        let storage = ScopedStorage::new(store, "1.0.0", "Alpha");
        storage.set("level", "7").unwrap();
    }

    let store = Arc::new(FileStore::with_path(path).unwrap());
    let storage = ScopedStorage::new(store, "1.0.0", "Alpha");
    assert_eq!(storage.get("level").unwrap().as_deref(), Some("7"));
}

#[test]
fn test_file_store_writes_json_object() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("storage.json");
    let store = FileStore::with_path(path.clone()).unwrap();

    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();

    let parsed: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(parsed, serde_json::json!({"a": "1", "b": "2"}));
}

#[test]
fn test_file_store_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::with_path(temp.path().join("storage.json")).unwrap();

    for i in 0..10 {
        store.set(&format!("k{}", i), "v").unwrap();
    }

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["storage.json"]);
}

#[test]
fn test_file_store_recovers_from_corrupt_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("storage.json");
    fs::write(&path, "{ this is not json").unwrap();

    let store = FileStore::with_path(path).unwrap();

    assert_eq!(store.get("anything").unwrap(), None);
    store.set("fresh", "start").unwrap();
    assert_eq!(store.get("fresh").unwrap().as_deref(), Some("start"));
}
