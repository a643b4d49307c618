//! # Namespaced Persistent Storage
//!
//! Key-value storage exposed to games and packs. Several artifacts may share
//! one backend, so every key is namespaced by the artifact's format version
//! and the game's name.
//!
//! ## Key Derivation
//!
//! ```text
//! Vortex-<version>-<base64(game name, spaces removed)>-<base64(key)>
//! ```
//!
//! The derivation is deterministic: the same `(version, game, key)` always
//! addresses the same slot, and distinct games never collide. Values are
//! stored base64-encoded.
//!
//! ## Backends
//!
//! | Backend         | Persistence                 |
//! |-----------------|-----------------------------|
//! | [`MemoryStore`] | Process lifetime            |
//! | [`FileStore`]   | JSON file, atomic rewrites  |
//!
//! ## Example
//!
//! ```rust,ignore
//! use vortex::storage::{FileStore, ScopedStorage};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(FileStore::new()?);
//! let storage = ScopedStorage::new(backend, "1.0.0", "Foo Bar");
//! storage.set("highscore", "42")?;
//! assert_eq!(storage.get("highscore")?.as_deref(), Some("42"));
//! ```

use crate::constants::STORAGE_KEY_PREFIX;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

// =============================================================================
// Backend Trait
// =============================================================================

/// A flat string key-value store shared by every session on a host.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Checks whether `key` holds a value.
    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

fn poisoned(e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("lock poisoned: {}", e))
}

// =============================================================================
// Memory Store
// =============================================================================

/// Volatile in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Store persisted as a single JSON object on disk.
///
/// The whole file is read at open and rewritten on every `set` via a temp
/// file + rename, so a crash leaves either the old or the new contents.
///
/// ## Thread Safety
///
/// Writers are serialized by an internal `RwLock`. Two `FileStore`s on the
/// same path in different processes overwrite each other (last writer wins).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at the default location.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_path())
    }

    /// Opens (or creates) the store at `path`.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Storage file {} is corrupt ({}), starting empty", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Storage(format!("failed to read {}: {}", path.display(), e))),
        };

        info!("Storage initialized at: {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Returns the default storage path.
    fn default_path() -> PathBuf {
        if let Some(data) = dirs::data_local_dir() {
            data.join("vortex").join("storage.json")
        } else {
            PathBuf::from(".vortex").join("storage.json")
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let temp_path = self
            .path
            .with_extension(format!("tmp.{}", uuid::Uuid::now_v7()));
        fs::write(&temp_path, json).map_err(|e| Error::Storage(e.to_string()))?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::Storage(e.to_string())
        })?;

        debug!("Flushed {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }
}

// =============================================================================
// Scoped Storage
// =============================================================================

/// Derives the backend key for `(version, game name, key)`.
pub fn derive_key(version: &str, game_name: &str, key: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        STORAGE_KEY_PREFIX,
        version,
        BASE64.encode(game_name.replace(' ', "")),
        BASE64.encode(key)
    )
}

/// Storage view namespaced to one artifact and game.
///
/// Cloning is cheap and clones share the game name, so renaming the game
/// through [`crate::session::Session::init`] re-scopes every handle.
#[derive(Clone)]
pub struct ScopedStorage {
    backend: Arc<dyn KeyValueStore>,
    version: String,
    game_name: Arc<RwLock<String>>,
}

impl ScopedStorage {
    /// Creates a scoped view over `backend`.
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        version: impl Into<String>,
        game_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            version: version.into(),
            game_name: Arc::new(RwLock::new(game_name.into())),
        }
    }

    /// Returns the current game name.
    pub fn game_name(&self) -> Result<String> {
        Ok(self.game_name.read().map_err(poisoned)?.clone())
    }

    /// Changes the game name that scopes subsequent keys.
    pub fn set_game_name(&self, name: &str) -> Result<()> {
        *self.game_name.write().map_err(poisoned)? = name.to_string();
        Ok(())
    }

    fn backend_key(&self, key: &str) -> Result<String> {
        let game_name = self.game_name.read().map_err(poisoned)?;
        Ok(derive_key(&self.version, &game_name, key))
    }

    /// Reads a value.
    ///
    /// An empty stored value reads as `None`, although [`ScopedStorage::has`]
    /// still reports it as present.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let encoded = match self.backend.get(&self.backend_key(key)?)? {
            Some(encoded) if !encoded.is_empty() => encoded,
            _ => return Ok(None),
        };

        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| Error::Storage(format!("corrupt value for '{}': {}", key, e)))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::Storage(format!("corrupt value for '{}': {}", key, e)))
    }

    /// Writes a value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend
            .set(&self.backend_key(key)?, &BASE64.encode(value))
    }

    /// Checks whether a value exists.
    pub fn has(&self, key: &str) -> Result<bool> {
        self.backend.has(&self.backend_key(key)?)
    }
}

impl std::fmt::Debug for ScopedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStorage")
            .field("version", &self.version)
            .field("game_name", &self.game_name)
            .finish_non_exhaustive()
    }
}
