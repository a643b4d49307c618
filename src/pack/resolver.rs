//! # Pack Resolver
//!
//! Resolves pack identifiers to modules and memoizes their instantiated APIs.
//!
//! ## State Machine (per identifier)
//!
//! ```text
//!   Unloaded ──acquire──► Loading ──module resolved──► Loaded
//!                            │                           │
//!                            │ acquire(id) again         │ acquire(id, variant)
//!                            ▼                           ▼
//!                   CircularDependency        instance slot (id, variant)
//!                                              instantiated at most once
//! ```
//!
//! Two independent memoization tables back the resolver:
//!
//! | Table     | Key              | Value                        |
//! |-----------|------------------|------------------------------|
//! | modules   | `PackId`         | `Arc<dyn PackModule>`        |
//! | instances | `(PackId, Variant)` | async once-cell of `PackApi` |
//!
//! ## Cycle Guard
//!
//! An identifier sits in the loading set only while its module is being
//! resolved. A nested acquisition of the same identifier during that window
//! fails with [`Error::CircularDependency`]. The entry is removed whether
//! resolution succeeds or fails, so a failed pack can be retried.
//!
//! The guard does not cover instantiation: a pack whose entry function
//! acquires its own variant waits on itself.
//!
//! ## Module Sources
//!
//! The module of `A.B` is looked up at `/packs/A/B/index.js` in the
//! session's VFS. When absent, the loader is pointed at the same path under
//! the external pack base URL.

use super::{
    Exports, PackApi, PackContext, PackId, PackModule, SiblingPacks, Variant, missing_export,
};
use crate::error::{Error, Result};
use crate::file::FileAccessor;
use crate::session::MountPoint;
use crate::storage::ScopedStorage;
use crate::vfs::Vfs;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::OnceCell;
use tracing::{debug, info};

// =============================================================================
// Module Loading
// =============================================================================

/// Where a pack module's code comes from.
#[derive(Debug, Clone)]
pub enum ModuleSource {
    /// Shipped inside the artifact.
    Embedded { path: String, code: Arc<[u8]> },
    /// Not in the artifact; fetched from the external pack host.
    External { url: String },
}

impl std::fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded { path, .. } => write!(f, "embedded {}", path),
            Self::External { url } => write!(f, "external {}", url),
        }
    }
}

/// Turns a module source into a pack module.
///
/// The `linker` lets a loader acquire other packs while resolving; those
/// acquisitions go through the cycle guard.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Resolves the module for `id`.
    async fn load(
        &self,
        id: &PackId,
        source: ModuleSource,
        linker: Linker,
    ) -> Result<Arc<dyn PackModule>>;
}

/// Weak handle back into a resolver.
///
/// Held by loaders and pack contexts; it never keeps the resolver alive.
/// Acquisitions through a linker always yield [`Variant::Internal`], so code
/// running inside pack resolution never sees another pack's user API.
#[derive(Clone)]
pub struct Linker {
    resolver: Weak<PackResolver>,
}

impl Linker {
    /// Acquires the internal API of pack `id`.
    pub async fn acquire(&self, id: &str, config: Value) -> Result<PackApi> {
        let resolver = self
            .resolver
            .upgrade()
            .ok_or_else(|| Error::Internal("pack resolver dropped".to_string()))?;
        resolver.acquire(id, Variant::Internal, config).await
    }
}

impl std::fmt::Debug for Linker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linker")
            .field("live", &(self.resolver.strong_count() > 0))
            .finish()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Session-level settings for pack resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Passed to every pack context.
    pub debug: bool,
    /// Base URL for packs missing from the artifact.
    pub external_base: String,
    /// Root mount handed to packs.
    pub root: MountPoint,
}

type InstanceSlot = Arc<OnceCell<PackApi>>;

fn poisoned(e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("lock poisoned: {}", e))
}

/// Resolves and caches packs for one session.
pub struct PackResolver {
    vfs: Arc<Vfs>,
    loader: Arc<dyn ModuleLoader>,
    storage: ScopedStorage,
    options: ResolverOptions,
    modules: RwLock<HashMap<PackId, Arc<dyn PackModule>>>,
    instances: RwLock<HashMap<(PackId, Variant), InstanceSlot>>,
    loading: Mutex<HashSet<PackId>>,
    this: Weak<PackResolver>,
}

impl PackResolver {
    /// Creates a resolver over a session's VFS and storage.
    pub fn new(
        vfs: Arc<Vfs>,
        loader: Arc<dyn ModuleLoader>,
        storage: ScopedStorage,
        options: ResolverOptions,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            vfs,
            loader,
            storage,
            options,
            modules: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashSet::new()),
            this: this.clone(),
        })
    }

    /// Returns a weak handle to this resolver.
    pub fn linker(&self) -> Linker {
        Linker {
            resolver: self.this.clone(),
        }
    }

    /// Acquires `variant` of pack `id`, resolving and instantiating on
    /// first use.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPackId`] for malformed identifiers
    /// - [`Error::CircularDependency`] if `id` is still being resolved
    /// - [`Error::MissingExport`] if the module lacks the variant's export
    /// - any error from the module loader or the entry function
    pub async fn acquire(&self, id: &str, variant: Variant, config: Value) -> Result<PackApi> {
        let id = PackId::parse(id)?;
        let module = self.module(&id).await?;
        let slot = self.instance_slot(&id, variant)?;

        let api = slot
            .get_or_try_init(|| self.instantiate(&id, variant, module, config))
            .await?;
        Ok(api.clone())
    }

    /// Returns true once the module for `id` has been resolved.
    pub fn is_loaded(&self, id: &str) -> bool {
        let Ok(id) = PackId::parse(id) else {
            return false;
        };
        self.modules
            .read()
            .map(|modules| modules.contains_key(&id))
            .unwrap_or(false)
    }

    /// Returns true while the module for `id` is being resolved.
    pub fn is_loading(&self, id: &str) -> bool {
        let Ok(id) = PackId::parse(id) else {
            return false;
        };
        self.loading
            .lock()
            .map(|loading| loading.contains(&id))
            .unwrap_or(false)
    }

    /// Returns the identifiers of all resolved modules, sorted.
    pub fn loaded_packs(&self) -> Result<Vec<PackId>> {
        let mut ids: Vec<PackId> = self.modules.read().map_err(poisoned)?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn module(&self, id: &PackId) -> Result<Arc<dyn PackModule>> {
        // At most one caller holds the claim for `id`.
        {
            let mut loading = self.loading.lock().map_err(poisoned)?;
            if loading.contains(id) {
                return Err(Error::CircularDependency { id: id.to_string() });
            }
            if let Some(module) = self.modules.read().map_err(poisoned)?.get(id).cloned() {
                return Ok(module);
            }
            loading.insert(id.clone());
        }

        let registered = match self.resolve_module(id).await {
            Ok(module) => self
                .modules
                .write()
                .map_err(poisoned)
                .map(|mut modules| Arc::clone(modules.entry(id.clone()).or_insert(module))),
            Err(e) => Err(e),
        };
        // The module is published before the claim is released.
        self.loading.lock().map_err(poisoned)?.remove(id);

        let module = registered?;
        info!("Pack {} loaded", id);
        Ok(module)
    }

    async fn resolve_module(&self, id: &PackId) -> Result<Arc<dyn PackModule>> {
        let path = id.module_path();
        let source = match self.vfs.read_file(&path) {
            Ok(code) => ModuleSource::Embedded { path, code },
            Err(_) => ModuleSource::External {
                url: format!("{}{}", self.options.external_base.trim_end_matches('/'), path),
            },
        };

        debug!("Resolving pack {} from {}", id, source);
        self.loader.load(id, source, self.linker()).await
    }

    fn instance_slot(&self, id: &PackId, variant: Variant) -> Result<InstanceSlot> {
        let mut instances = self.instances.write().map_err(poisoned)?;
        Ok(Arc::clone(
            instances.entry((id.clone(), variant)).or_default(),
        ))
    }

    async fn instantiate(
        &self,
        id: &PackId,
        variant: Variant,
        module: Arc<dyn PackModule>,
        config: Value,
    ) -> Result<PackApi> {
        let exports: Exports = module.exports();
        let export = variant
            .select_export(exports)
            .ok_or_else(|| missing_export(id, variant))?;

        debug!("Instantiating {} API of pack {} via {} export", variant, id, export);
        module.instantiate(export, self.context(), config).await
    }

    fn context(&self) -> PackContext {
        PackContext {
            root: self.options.root.clone(),
            debug: self.options.debug,
            files: FileAccessor::new(Arc::clone(&self.vfs)),
            storage: self.storage.clone(),
            packs: SiblingPacks::new(self.linker()),
        }
    }
}

impl std::fmt::Debug for PackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
