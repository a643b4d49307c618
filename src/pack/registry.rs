//! Native pack registry.
//!
//! Hosts that compile their packs into the binary register them here by
//! identifier. [`NativeRegistry`] then serves as the [`ModuleLoader`]: the
//! source the resolver found (embedded or external) is only logged, the
//! module itself comes from the table.
//!
//! [`FnPack`] builds a module from async closures, one per export.

use super::resolver::{Linker, ModuleLoader, ModuleSource};
use super::{Export, Exports, PackApi, PackContext, PackId, PackModule};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tracing::debug;

// =============================================================================
// Closure-backed Module
// =============================================================================

type EntryFuture = Pin<Box<dyn Future<Output = Result<PackApi>> + Send>>;
type EntryFn = Arc<dyn Fn(PackContext, Value) -> EntryFuture + Send + Sync>;

/// A pack module whose exports are async closures.
///
/// ```rust,ignore
/// let pack = FnPack::new()
///     .public(|_ctx, _config| async { Ok(PackApi::new(Gamepad::default())) })
///     .internal(|ctx, _config| async move { Ok(PackApi::new(RawInput::new(ctx))) });
/// ```
#[derive(Clone, Default)]
pub struct FnPack {
    entries: HashMap<Export, EntryFn>,
}

impl FnPack {
    /// Creates a module with no exports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the public export.
    pub fn public<F, Fut>(self, entry: F) -> Self
    where
        F: Fn(PackContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PackApi>> + Send + 'static,
    {
        self.export(Export::Public, entry)
    }

    /// Sets the internal export.
    pub fn internal<F, Fut>(self, entry: F) -> Self
    where
        F: Fn(PackContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PackApi>> + Send + 'static,
    {
        self.export(Export::Internal, entry)
    }

    fn export<F, Fut>(mut self, export: Export, entry: F) -> Self
    where
        F: Fn(PackContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PackApi>> + Send + 'static,
    {
        let entry: EntryFn = Arc::new(move |ctx: PackContext, config: Value| -> EntryFuture {
            Box::pin(entry(ctx, config))
        });
        self.entries.insert(export, entry);
        self
    }
}

#[async_trait]
impl PackModule for FnPack {
    fn exports(&self) -> Exports {
        Exports {
            public: self.entries.contains_key(&Export::Public),
            internal: self.entries.contains_key(&Export::Internal),
        }
    }

    async fn instantiate(
        &self,
        export: Export,
        ctx: PackContext,
        config: Value,
    ) -> Result<PackApi> {
        let entry = self
            .entries
            .get(&export)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("{} export not provided", export)))?;
        entry(ctx, config).await
    }
}

impl std::fmt::Debug for FnPack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPack")
            .field("exports", &self.exports())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Module loader backed by a table of natively compiled packs.
#[derive(Default)]
pub struct NativeRegistry {
    modules: RwLock<HashMap<String, Arc<dyn PackModule>>>,
}

impl NativeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under `id`, replacing any previous entry.
    pub fn register(&self, id: &str, module: Arc<dyn PackModule>) -> Result<()> {
        let id = PackId::parse(id)?;
        self.modules
            .write()
            .map_err(|e| Error::Internal(format!("lock poisoned: {}", e)))?
            .insert(id.to_string(), module);
        Ok(())
    }

    /// Builder-style [`NativeRegistry::register`].
    pub fn with(self, id: &str, module: impl PackModule + 'static) -> Result<Self> {
        self.register(id, Arc::new(module))?;
        Ok(self)
    }

    /// Returns the registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .modules
            .read()
            .map(|modules| modules.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ModuleLoader for NativeRegistry {
    async fn load(
        &self,
        id: &PackId,
        source: ModuleSource,
        _linker: Linker,
    ) -> Result<Arc<dyn PackModule>> {
        let module = self
            .modules
            .read()
            .map_err(|e| Error::Internal(format!("lock poisoned: {}", e)))?
            .get(id.as_str())
            .cloned();

        match module {
            Some(module) => {
                debug!("Pack {} served natively (source: {})", id, source);
                Ok(module)
            }
            None => Err(Error::PackLoadFailed {
                id: id.to_string(),
                reason: format!("no native module registered ({})", source),
            }),
        }
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_pack_exports() {
        let pack = FnPack::new();
        assert_eq!(pack.exports(), Exports::default());

        let pack = pack.public(|_, _| async { Ok(PackApi::new(1u8)) });
        assert_eq!(pack.exports(), Exports::PUBLIC);

        let pack = pack.internal(|_, _| async { Ok(PackApi::new(2u8)) });
        assert_eq!(pack.exports(), Exports::BOTH);
    }

    #[test]
    fn test_register_rejects_invalid_id() {
        let registry = NativeRegistry::new();
        let result = registry.register("bad/id", Arc::new(FnPack::new()));
        assert!(matches!(result, Err(Error::InvalidPackId { .. })));
        assert!(registry.ids().is_empty());
    }

    #[test]
    fn test_ids_sorted() {
        let registry = NativeRegistry::new()
            .with("Vortex.Screen", FnPack::new())
            .unwrap()
            .with("Vortex.Input", FnPack::new())
            .unwrap();
        assert_eq!(registry.ids(), vec!["Vortex.Input", "Vortex.Screen"]);
    }
}
