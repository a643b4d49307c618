//! # Packs - Lazily Acquired Engine Plugins
//!
//! A pack is a named plugin module that exposes up to two instantiable API
//! variants:
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   game code ──► │ public export   → User API   │
//!                 │                              │  (one module, two
//!   sibling   ──► │ internal export → Internal   │   memoized APIs)
//!   packs         │   (falls back to public)     │
//!                 └──────────────────────────────┘
//! ```
//!
//! Games only ever see the **user** variant. Packs acquiring each other
//! through their [`PackContext`] always get the **internal** variant, so a
//! pack can offer a richer surface to its siblings than to game code.
//!
//! ## Module Contract
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait PackModule: Send + Sync {
//!     fn exports(&self) -> Exports;
//!     async fn instantiate(&self, export: Export, ctx: PackContext, config: Value)
//!         -> Result<PackApi>;
//! }
//! ```
//!
//! Resolution and caching live in [`resolver`]; a table-driven loader for
//! modules compiled into the host lives in [`registry`].
//!
//! ## Security
//!
//! Pack identifiers become VFS paths and URLs, so they are validated on
//! entry: dot-separated segments of `[A-Za-z0-9_-]`. A validated identifier
//! cannot contain `/` or an empty segment, so it cannot escape `/packs/`.

pub mod registry;
pub mod resolver;

pub use registry::{FnPack, NativeRegistry};
pub use resolver::{Linker, ModuleLoader, ModuleSource, PackResolver, ResolverOptions};

use crate::constants::{PACK_ENTRY_FILE, PACKS_ROOT, validate_pack_id};
use crate::error::{Error, Result};
use crate::file::FileAccessor;
use crate::session::MountPoint;
use crate::storage::ScopedStorage;
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

// =============================================================================
// Identifiers and Variants
// =============================================================================

/// Validated pack identifier, e.g. `Vortex.Input`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackId(String);

impl PackId {
    /// Parses and validates an identifier.
    pub fn parse(id: &str) -> Result<Self> {
        validate_pack_id(id).map_err(|reason| Error::InvalidPackId {
            id: id.to_string(),
            reason,
        })?;
        Ok(Self(id.to_string()))
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the conventional VFS path of the pack's entry module.
    ///
    /// The first `.` becomes a path separator and later dots stay in the
    /// directory name: `Vortex.Input` → `/packs/Vortex/Input/index.js`,
    /// `Acme.Audio.Mixer` → `/packs/Acme/Audio.Mixer/index.js`.
    pub fn module_path(&self) -> String {
        format!("{}/{}/{}", PACKS_ROOT, self.0.replacen('.', "/", 1), PACK_ENTRY_FILE)
    }
}

impl std::fmt::Display for PackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which API of a pack a caller receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Game-facing API, built from the public export.
    User,
    /// Sibling-facing API, built from the internal export when present.
    Internal,
}

impl Variant {
    /// Selects the export that instantiates this variant.
    ///
    /// `User` requires `Public`. `Internal` prefers `Internal` and falls
    /// back to `Public`.
    pub fn select_export(&self, exports: Exports) -> Option<Export> {
        match self {
            Self::User => exports.public.then_some(Export::Public),
            Self::Internal => {
                if exports.internal {
                    Some(Export::Internal)
                } else {
                    exports.public.then_some(Export::Public)
                }
            }
        }
    }

    fn required_export(&self) -> &'static str {
        match self {
            Self::User => "public",
            Self::Internal => "internal or public",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// An entry function of a pack module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Export {
    Public,
    Internal,
}

impl std::fmt::Display for Export {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// The set of exports a module provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Exports {
    pub public: bool,
    pub internal: bool,
}

impl Exports {
    /// Only a public export.
    pub const PUBLIC: Self = Self {
        public: true,
        internal: false,
    };

    /// Public and internal exports.
    pub const BOTH: Self = Self {
        public: true,
        internal: true,
    };

    /// Returns true if `export` is provided.
    pub fn has(&self, export: Export) -> bool {
        match export {
            Export::Public => self.public,
            Export::Internal => self.internal,
        }
    }
}

// =============================================================================
// API Handles
// =============================================================================

/// Opaque, shared handle to an instantiated pack API.
///
/// Clones point at the same object; [`PackApi::ptr_eq`] tells whether two
/// handles came from the same instantiation.
#[derive(Clone)]
pub struct PackApi(Arc<dyn Any + Send + Sync>);

impl PackApi {
    /// Wraps an API object.
    pub fn new<T: Any + Send + Sync>(api: T) -> Self {
        Self(Arc::new(api))
    }

    /// Wraps an already shared API object.
    pub fn from_arc<T: Any + Send + Sync>(api: Arc<T>) -> Self {
        Self(api)
    }

    /// Returns the API as `T`, if that is its concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    /// Borrows the API as `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns true if both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for PackApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PackApi")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}

// =============================================================================
// Context
// =============================================================================

/// Capabilities handed to a pack's entry function.
#[derive(Debug, Clone)]
pub struct PackContext {
    /// Element the pack may render into.
    pub root: MountPoint,
    /// Debug flag of the session.
    pub debug: bool,
    /// Typed access to the artifact's files.
    pub files: FileAccessor,
    /// Storage scoped to the running game.
    pub storage: ScopedStorage,
    /// Acquires sibling packs (internal variant only).
    pub packs: SiblingPacks,
}

/// Sibling-pack accessor given to pack code.
///
/// Every acquisition through it yields the [`Variant::Internal`] API.
#[derive(Debug, Clone)]
pub struct SiblingPacks {
    linker: Linker,
}

impl SiblingPacks {
    pub(crate) fn new(linker: Linker) -> Self {
        Self { linker }
    }

    /// Acquires the internal API of pack `id`.
    pub async fn acquire(&self, id: &str, config: Value) -> Result<PackApi> {
        self.linker.acquire(id, config).await
    }
}

// =============================================================================
// Module Trait
// =============================================================================

/// A resolved pack module.
#[async_trait]
pub trait PackModule: Send + Sync {
    /// Returns the exports this module provides.
    fn exports(&self) -> Exports {
        Exports::PUBLIC
    }

    /// Runs the entry function `export`.
    ///
    /// Only called with an export listed by [`PackModule::exports`].
    async fn instantiate(&self, export: Export, ctx: PackContext, config: Value)
    -> Result<PackApi>;
}

pub(crate) fn missing_export(id: &PackId, variant: Variant) -> Error {
    Error::MissingExport {
        id: id.to_string(),
        export: variant.required_export().to_string(),
    }
}
