//! # Session - Runtime Surface of a Loaded Artifact
//!
//! A [`Session`] is what a running game sees of the engine. There is exactly
//! one per loaded artifact; it is created by the [`crate::loader::Loader`]
//! after decoding and lives until the host drops it. Nothing is global, so
//! several sessions can coexist in one process (e.g. in tests).
//!
//! | Surface      | Method                 | Notes                          |
//! |--------------|------------------------|--------------------------------|
//! | version      | [`Session::version`]   | manifest version tag           |
//! | init         | [`Session::init`]      | title, icon, storage namespace |
//! | files        | [`Session::file`]      | raw/text/json/media            |
//! | packs        | [`Session::pack`]      | always the user variant        |
//! | storage      | [`Session::storage`]   | scoped by version + game name  |
//!
//! The page (or whatever embeds the engine) is abstracted as a [`Host`].

use crate::constants::DEFAULT_GAME_NAME;
use crate::error::Result;
use crate::file::{FileAccessor, FileKind, FileValue, MediaHandle};
use crate::pack::{ModuleLoader, PackApi, PackResolver, ResolverOptions, Variant};
use crate::storage::{KeyValueStore, ScopedStorage};
use crate::vfs::Vfs;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

// =============================================================================
// Host Boundary
// =============================================================================

/// Handle to the element games and packs render into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint(String);

impl MountPoint {
    /// Creates a mount point for the element with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the element id.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl Default for MountPoint {
    fn default() -> Self {
        Self::new("root")
    }
}

/// The environment a session runs in.
#[async_trait]
pub trait Host: Send + Sync {
    /// Sets the display title.
    fn set_title(&self, title: &str);

    /// Sets the display icon from a URL (possibly a `data:` URL).
    fn set_icon(&self, href: &str);

    /// Returns the element packs mount into.
    fn root_mount(&self) -> MountPoint {
        MountPoint::default()
    }

    /// Executes the bundle as a module, after the session is installed.
    async fn run_bundle(&self, code: &str, session: Arc<Session>) -> Result<()>;
}

/// Host that records title and icon and does not execute code.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    title: RwLock<Option<String>>,
    icon: RwLock<Option<String>>,
    bundle_runs: AtomicUsize,
    last_bundle_len: AtomicUsize,
}

impl HeadlessHost {
    /// Creates a headless host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last title set.
    pub fn title(&self) -> Option<String> {
        self.title.read().ok().and_then(|t| t.clone())
    }

    /// Returns the last icon set.
    pub fn icon(&self) -> Option<String> {
        self.icon.read().ok().and_then(|i| i.clone())
    }

    /// Returns how many bundles were handed to this host.
    pub fn bundle_runs(&self) -> usize {
        self.bundle_runs.load(Ordering::SeqCst)
    }

    /// Returns the size of the last bundle handed to this host.
    pub fn last_bundle_len(&self) -> usize {
        self.last_bundle_len.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Host for HeadlessHost {
    fn set_title(&self, title: &str) {
        if let Ok(mut slot) = self.title.write() {
            *slot = Some(title.to_string());
        }
    }

    fn set_icon(&self, href: &str) {
        if let Ok(mut slot) = self.icon.write() {
            *slot = Some(href.to_string());
        }
    }

    async fn run_bundle(&self, code: &str, session: Arc<Session>) -> Result<()> {
        debug!(
            "Headless host skipping bundle execution ({} bytes, version {})",
            code.len(),
            session.version()
        );
        self.last_bundle_len.store(code.len(), Ordering::SeqCst);
        self.bundle_runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Game Init
// =============================================================================

/// Display icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    /// Any URL the host understands.
    Url(String),
    /// An image file from the artifact.
    Image(MediaHandle),
}

impl Icon {
    fn href(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Image(handle) => handle.to_data_url(),
        }
    }
}

/// Arguments of [`Session::init`]. Unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct GameInit {
    pub name: Option<String>,
    pub icon: Option<Icon>,
}

// =============================================================================
// Session
// =============================================================================

/// Settings for a new session.
#[derive(Clone)]
pub struct SessionOptions {
    /// Debug flag exposed to packs.
    pub debug: bool,
    /// Base URL for packs not shipped in the artifact.
    pub pack_base_url: String,
    /// Backend behind the session's scoped storage.
    pub store: Arc<dyn KeyValueStore>,
}

/// Runtime surface of one loaded artifact.
pub struct Session {
    version: String,
    debug: bool,
    files: FileAccessor,
    storage: ScopedStorage,
    resolver: Arc<PackResolver>,
    host: Arc<dyn Host>,
}

impl Session {
    /// Creates a session over a reconstructed VFS.
    pub fn new(
        version: impl Into<String>,
        vfs: Arc<Vfs>,
        host: Arc<dyn Host>,
        modules: Arc<dyn ModuleLoader>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let version = version.into();
        let storage = ScopedStorage::new(options.store, version.clone(), DEFAULT_GAME_NAME);
        let resolver = PackResolver::new(
            Arc::clone(&vfs),
            modules,
            storage.clone(),
            ResolverOptions {
                debug: options.debug,
                external_base: options.pack_base_url,
                root: host.root_mount(),
            },
        );

        Arc::new(Self {
            version,
            debug: options.debug,
            files: FileAccessor::new(vfs),
            storage,
            resolver,
            host,
        })
    }

    /// Returns the artifact's format version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the debug flag.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Applies game metadata: title, icon and storage namespace.
    ///
    /// An empty name or icon URL counts as unset.
    pub fn init(&self, init: &GameInit) -> Result<()> {
        if let Some(name) = init.name.as_deref().filter(|name| !name.is_empty()) {
            self.host.set_title(name);
            self.storage.set_game_name(name)?;
            info!("Game initialized: {}", name);
        }
        if let Some(href) = init.icon.as_ref().map(Icon::href).filter(|href| !href.is_empty()) {
            self.host.set_icon(&href);
        }
        Ok(())
    }

    /// Reads a file in the requested shape.
    pub fn file(&self, path: &str, kind: FileKind) -> Result<FileValue> {
        self.files.get(path, kind)
    }

    /// Returns the typed file accessor.
    pub fn files(&self) -> &FileAccessor {
        &self.files
    }

    /// Acquires the user API of pack `id`.
    pub async fn pack(&self, id: &str, config: Value) -> Result<PackApi> {
        self.resolver.acquire(id, Variant::User, config).await
    }

    /// Returns the session's scoped storage.
    pub fn storage(&self) -> &ScopedStorage {
        &self.storage
    }

    /// Returns the host.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.version)
            .field("debug", &self.debug)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}
