//! # Loader (run side)
//!
//! Fetches an artifact, checks and decodes it, and starts a [`Session`].
//!
//! ## Launch Sequence
//!
//! ```text
//! ArtifactSource::fetch
//!        │
//!        ▼
//! verify digest (optional) ──► DigestMismatch
//!        │
//!        ▼
//! Container::decode ──► Vfs (assets in key order)
//!        │
//!        ▼
//! Session::new (storage, pack resolver, host)
//!        │
//!        ▼
//! Host::run_bundle(bundle, session)
//! ```
//!
//! The session is fully built before any bundle code runs, so game code
//! always sees a complete runtime surface.
//!
//! ## Security
//!
//! Artifacts are untrusted input. Size limits are enforced before and
//! during decoding (see [`crate::container`]). Supplying
//! [`LoadOptions::expected_digest`] pins the exact bytes to run.

use crate::constants::MAX_ARTIFACT_SIZE;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::pack::ModuleLoader;
use crate::packager::Artifact;
use crate::session::{Host, Session, SessionOptions};
use crate::storage::{KeyValueStore, MemoryStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Artifact Sources
// =============================================================================

/// Somewhere artifact bytes can be fetched from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Describes the source for logs.
    fn describe(&self) -> String;

    /// Fetches the complete artifact.
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Artifact stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ArtifactSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: self.path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        if metadata.len() > MAX_ARTIFACT_SIZE as u64 {
            return Err(Error::ArtifactTooLarge {
                size: metadata.len(),
                limit: MAX_ARTIFACT_SIZE as u64,
            });
        }

        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Artifact already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    /// Creates a source over `bytes`.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ArtifactSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.bytes.len())
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Run-side settings.
#[derive(Clone)]
pub struct LoadOptions {
    /// Debug flag handed to packs.
    pub debug: bool,
    /// Base URL for packs not shipped in the artifact.
    pub pack_base_url: String,
    /// When set, the artifact's `sha256:<hex>` digest must match.
    pub expected_digest: Option<String>,
    /// Storage backend shared by sessions.
    pub store: Arc<dyn KeyValueStore>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            debug: false,
            pack_base_url: String::new(),
            expected_digest: None,
            store: Arc::new(MemoryStore::new()),
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("debug", &self.debug)
            .field("pack_base_url", &self.pack_base_url)
            .field("expected_digest", &self.expected_digest)
            .finish_non_exhaustive()
    }
}

/// A decoded artifact with its session, before the bundle runs.
#[derive(Debug)]
pub struct LoadedArtifact {
    /// Session over the artifact's files.
    pub session: Arc<Session>,
    /// Bundle text to execute.
    pub bundle: String,
    /// Digest of the fetched bytes.
    pub digest: String,
}

/// Loads artifacts into sessions on a host.
pub struct Loader {
    host: Arc<dyn Host>,
    modules: Arc<dyn ModuleLoader>,
    options: LoadOptions,
}

impl Loader {
    /// Creates a loader.
    pub fn new(host: Arc<dyn Host>, modules: Arc<dyn ModuleLoader>, options: LoadOptions) -> Self {
        Self {
            host,
            modules,
            options,
        }
    }

    /// Fetches, verifies and decodes an artifact, and builds its session.
    pub async fn open(&self, source: &dyn ArtifactSource) -> Result<LoadedArtifact> {
        debug!("Fetching artifact from {}", source.describe());
        let bytes = source.fetch().await?;

        let digest = Artifact::compute_digest(&bytes);
        if let Some(expected) = &self.options.expected_digest {
            verify_digest(expected, &digest)?;
        }

        let container = Container::decode(&bytes)?;
        let version = container.manifest.version().to_string();
        let bundle = container.bundle_text();
        let vfs = Arc::new(container.to_vfs());

        info!("Vortex Engine v{}", version);
        debug!("Artifact {}: {} files, {}", source.describe(), vfs.len(), digest);

        let session = Session::new(
            version,
            vfs,
            Arc::clone(&self.host),
            Arc::clone(&self.modules),
            SessionOptions {
                debug: self.options.debug,
                pack_base_url: self.options.pack_base_url.clone(),
                store: Arc::clone(&self.options.store),
            },
        );

        Ok(LoadedArtifact {
            session,
            bundle,
            digest,
        })
    }

    /// Opens an artifact and hands its bundle to the host.
    pub async fn launch(&self, source: &dyn ArtifactSource) -> Result<Arc<Session>> {
        let loaded = self.open(source).await?;
        self.host
            .run_bundle(&loaded.bundle, Arc::clone(&loaded.session))
            .await?;
        Ok(loaded.session)
    }
}

/// Compares a computed digest against the expected one.
///
/// The `sha256:` prefix is optional on `expected`; hex case is ignored.
pub fn verify_digest(expected: &str, computed: &str) -> Result<()> {
    let strip = |d: &str| d.strip_prefix("sha256:").unwrap_or(d).to_ascii_lowercase();
    if strip(expected) == strip(computed) {
        Ok(())
    } else {
        Err(Error::DigestMismatch {
            expected: expected.to_string(),
            computed: computed.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_digest_accepts_bare_hex() {
        let computed = Artifact::compute_digest(b"abc");
        let bare = computed.trim_start_matches("sha256:").to_uppercase();
        assert!(verify_digest(&computed, &computed).is_ok());
        assert!(verify_digest(&bare, &computed).is_ok());
    }

    #[test]
    fn test_verify_digest_mismatch() {
        let computed = Artifact::compute_digest(b"abc");
        let err = verify_digest("sha256:00", &computed).unwrap_err();
        assert!(matches!(err, Error::DigestMismatch { .. }));
    }

    #[tokio::test]
    async fn test_memory_source_fetch() {
        let source = MemorySource::new(vec![1u8, 2, 3]);
        assert_eq!(source.fetch().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(source.describe(), "memory (3 bytes)");
    }
}
