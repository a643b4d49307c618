//! # Packager (build side)
//!
//! Turns a project held in a [`Vfs`] into a single compressed artifact.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Config::load │──►│   Bundler    │──►│ collect      │──►│ Container    │
//! │ /vortex.json │   │ + VfsPlugin  │   │ assets       │   │ encode       │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!   defaults on        confinement        skip config,       zip(store)
//!   parse error        + source kinds     scripts, ignored   + zlib
//! ```
//!
//! ## Confinement
//!
//! Every import the bundler asks about goes through [`VfsPlugin`]. Imports
//! under [`EXTERNAL_NAMESPACE`] are marked external and never bundled. All
//! other imports must resolve inside the configured scripts root or the
//! build fails with a [`Error::ConfinementViolation`] message.
//!
//! ## Failure Policy
//!
//! Any bundler diagnostic aborts packaging with [`Error::BuildFailed`],
//! aggregating every message. No partial artifact is produced.

use crate::bundler::{
    BuildRequest, Bundler, BundlerHooks, HookResult, Loaded, Message, ResolveArgs, Resolved,
    SourceKind,
};
use crate::config::Config;
use crate::constants::{BUNDLE_OUTFILE, CONFIG_PATH, EXTERNAL_NAMESPACE};
use crate::container::{Container, Manifest};
use crate::error::{Error, Result};
use crate::vfs::Vfs;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Artifact
// =============================================================================

/// A packaged artifact ready to be written or transferred.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name: config name without whitespace, plus the extension.
    pub name: String,
    /// Compressed artifact bytes.
    pub bytes: Vec<u8>,
    /// `sha256:<hex>` of `bytes`.
    pub digest: String,
    /// Manifest written into the artifact.
    pub manifest: Manifest,
}

impl Artifact {
    /// Computes the digest string for artifact bytes.
    pub fn compute_digest(bytes: &[u8]) -> String {
        format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
    }

    /// Writes the artifact into `dir` under its name.
    ///
    /// The bytes land in a uniquely named temp file first and are renamed
    /// into place, so readers never observe a partial artifact.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let write_err = |path: &Path, e: std::io::Error| Error::ArtifactWriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        fs::create_dir_all(dir).map_err(|e| write_err(dir, e))?;

        let path = dir.join(&self.name);
        let temp_path = dir.join(format!(".{}.tmp.{}", self.name, uuid::Uuid::now_v7()));

        fs::write(&temp_path, &self.bytes).map_err(|e| write_err(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            write_err(&path, e)
        })?;

        info!("Wrote artifact {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

// =============================================================================
// VFS Bundler Plugin
// =============================================================================

/// Resolve and load hooks backed by a [`Vfs`], confined to a scripts root.
pub struct VfsPlugin<'a> {
    vfs: &'a Vfs,
    scripts_root: &'a str,
}

impl<'a> VfsPlugin<'a> {
    /// Creates hooks over `vfs`. `scripts_root` must be `/`-prefixed and
    /// `/`-suffixed.
    pub fn new(vfs: &'a Vfs, scripts_root: &'a str) -> Self {
        Self { vfs, scripts_root }
    }
}

impl BundlerHooks for VfsPlugin<'_> {
    fn resolve(&self, args: &ResolveArgs) -> HookResult<Resolved> {
        if args.path.starts_with(EXTERNAL_NAMESPACE) {
            return Ok(Resolved {
                path: args.path.clone(),
                external: true,
            });
        }

        let resolved = Vfs::resolve(&args.path, args.importer.as_deref());

        if !resolved.starts_with(self.scripts_root) {
            let violation = Error::ConfinementViolation {
                import: args.path.clone(),
                resolved,
                root: self.scripts_root.to_string(),
            };
            return Err(vec![Message::new(violation.to_string())]);
        }

        Ok(Resolved {
            path: resolved,
            external: false,
        })
    }

    fn load(&self, path: &str) -> HookResult<Loaded> {
        let contents = self
            .vfs
            .read_file(path)
            .map_err(|e| vec![Message::new(e.to_string())])?;

        Ok(Loaded {
            contents,
            kind: SourceKind::from_path(path),
        })
    }
}

// =============================================================================
// Packager
// =============================================================================

/// Options controlling a packaging run.
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Ask the bundler to minify.
    pub minify: bool,
}

/// Packages projects using a given bundler.
pub struct Packager {
    bundler: Arc<dyn Bundler>,
    options: PackageOptions,
}

impl Packager {
    /// Creates a packager with default options.
    pub fn new(bundler: Arc<dyn Bundler>) -> Self {
        Self::with_options(bundler, PackageOptions::default())
    }

    /// Creates a packager with explicit options.
    pub fn with_options(bundler: Arc<dyn Bundler>, options: PackageOptions) -> Self {
        Self { bundler, options }
    }

    /// Packages the project in `vfs` into an artifact.
    pub async fn package(&self, vfs: &Vfs) -> Result<Artifact> {
        let config = Config::load(vfs);
        let entry_point = Vfs::resolve(&config.entry, Some(&config.scripts_root));

        debug!(
            "Bundling {} with {} (scripts root {})",
            entry_point,
            self.bundler.name(),
            config.scripts_root
        );

        let request = BuildRequest {
            entry_point,
            minify: self.options.minify,
            outfile: BUNDLE_OUTFILE.to_string(),
        };
        let hooks = VfsPlugin::new(vfs, &config.scripts_root);
        let output = self.bundler.build(&request, &hooks).await;

        if !output.errors.is_empty() {
            return Err(Error::BuildFailed {
                messages: output.errors.into_iter().map(|m| m.text).collect(),
            });
        }

        let assets = Self::collect_assets(vfs, &config);
        let container = Container::new(output.code, assets);
        let bytes = container.encode()?;
        let digest = Artifact::compute_digest(&bytes);
        let name = config.artifact_name();

        info!(
            "Packaged {}: {} assets, {} bytes, {}",
            name,
            container.assets.len(),
            bytes.len(),
            digest
        );

        Ok(Artifact {
            name,
            bytes,
            digest,
            manifest: container.manifest,
        })
    }

    /// Selects the non-script assets, in VFS order.
    ///
    /// Excludes the config file, everything under the scripts root, and any
    /// path matching an ignore pattern.
    pub fn collect_assets(vfs: &Vfs, config: &Config) -> Vec<(String, Arc<[u8]>)> {
        vfs.iter()
            .filter(|(path, _)| *path != CONFIG_PATH)
            .filter(|(path, _)| !path.starts_with(config.scripts_root.as_str()))
            .filter(|(path, _)| !config.is_ignored(path))
            .map(|(path, content)| (path.to_string(), Arc::clone(content)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin_vfs() -> Vfs {
        Vfs::from_iter([
            ("/scripts/main.ts", "import './util.ts';"),
            ("/scripts/util.ts", "export const x = 1;"),
            ("/outside/evil.ts", "steal();"),
        ])
    }

    #[test]
    fn test_resolve_external_passes_through() {
        let vfs = plugin_vfs();
        let plugin = VfsPlugin::new(&vfs, "/scripts/");
        let resolved = plugin
            .resolve(&ResolveArgs {
                path: "/lib/engine.js".to_string(),
                importer: Some("/scripts/main.ts".to_string()),
            })
            .unwrap();
        assert!(resolved.external);
        assert_eq!(resolved.path, "/lib/engine.js");
    }

    #[test]
    fn test_resolve_relative_inside_root() {
        let vfs = plugin_vfs();
        let plugin = VfsPlugin::new(&vfs, "/scripts/");
        let resolved = plugin
            .resolve(&ResolveArgs {
                path: "./util.ts".to_string(),
                importer: Some("/scripts/main.ts".to_string()),
            })
            .unwrap();
        assert!(!resolved.external);
        assert_eq!(resolved.path, "/scripts/util.ts");
    }

    #[test]
    fn test_resolve_escape_is_rejected() {
        let vfs = plugin_vfs();
        let plugin = VfsPlugin::new(&vfs, "/scripts/");
        let errors = plugin
            .resolve(&ResolveArgs {
                path: "../outside/evil.ts".to_string(),
                importer: Some("/scripts/main.ts".to_string()),
            })
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("../outside/evil.ts"));
        assert!(errors[0].text.contains("/scripts/"));
    }

    #[test]
    fn test_load_missing_file() {
        let vfs = plugin_vfs();
        let plugin = VfsPlugin::new(&vfs, "/scripts/");
        let errors = plugin.load("/scripts/missing.ts").unwrap_err();
        assert!(errors[0].text.contains("file not found"));
    }

    #[test]
    fn test_load_selects_kind() {
        let vfs = plugin_vfs();
        let plugin = VfsPlugin::new(&vfs, "/scripts/");
        let loaded = plugin.load("/scripts/util.ts").unwrap();
        assert_eq!(loaded.kind, SourceKind::TypedScript);
        assert_eq!(&loaded.contents[..], b"export const x = 1;");
    }
}
