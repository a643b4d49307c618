//! # vortex
//!
//! **Single-Artifact Packaging and Runtime for Browser-Style Games**
//!
//! This crate packs a game project (scripts, config, assets) into one
//! compressed artifact and loads that artifact back into a running session
//! with lazily acquired engine plugins ("packs").
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             vortex                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  BUILD SIDE                                                         │
//! │  ┌──────────┐   ┌────────────────────┐   ┌──────────────────────┐   │
//! │  │   Vfs    │──►│      Packager      │──►│   Container Codec    │   │
//! │  │ from_dir │   │ Config + Bundler   │   │ zip(store) + zlib    │   │
//! │  └──────────┘   │ confinement hooks  │   │ manifest "0" bundle  │   │
//! │                 └────────────────────┘   │ "1" assets "2".."N"  │   │
//! │                                          └──────────┬───────────┘   │
//! │                                         artifact    │               │
//! ├─────────────────────────────────────────────────────┼───────────────┤
//! │  RUN SIDE                                           ▼               │
//! │  ┌──────────────────┐   ┌───────────────┐   ┌─────────────────┐     │
//! │  │      Loader      │──►│    Session    │──►│  PackResolver   │     │
//! │  │ fetch + verify   │   │ files/storage │   │ Unloaded →      │     │
//! │  │ decode → Vfs     │   │ init/pack     │   │ Loading → Loaded│     │
//! │  └──────────────────┘   └───────────────┘   └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Security Model
//!
//! - **Script Confinement**: every bundled import must resolve inside the
//!   configured scripts root or under `/lib/` (external). Anything else fails
//!   the build (see [`packager::VfsPlugin`]).
//! - **Size Limits**: decoding is bounded by `MAX_ARTIFACT_SIZE`,
//!   `MAX_INFLATED_SIZE` and `MAX_ARCHIVE_ENTRIES`.
//! - **Digest Pinning**: packaging reports a `sha256:` digest; the loader can
//!   refuse artifacts that do not match it.
//! - **Pack Identifiers**: validated before they become VFS paths or URLs.
//!
//! # Example
//!
//! ```rust,ignore
//! use vortex::{ConcatBundler, FileSource, HeadlessHost, LoadOptions, Loader, NativeRegistry,
//!     Packager, Vfs};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> vortex::Result<()> {
//!     let vfs = Vfs::from_dir("./my-game".as_ref())?;
//!     let artifact = Packager::new(Arc::new(ConcatBundler::new())).package(&vfs).await?;
//!     let path = artifact.write_to("./dist".as_ref())?;
//!
//!     let loader = Loader::new(
//!         Arc::new(HeadlessHost::new()),
//!         Arc::new(NativeRegistry::new()),
//!         LoadOptions::default(),
//!     );
//!     let session = loader.launch(&FileSource::new(path)).await?;
//!     println!("running v{}", session.version());
//!     Ok(())
//! }
//! ```

pub mod bundler;
pub mod config;
pub mod constants;
pub mod container;
pub mod error;
pub mod file;
pub mod loader;
pub mod pack;
pub mod packager;
pub mod session;
pub mod storage;
pub mod vfs;

// Re-exports
pub use bundler::{Bundler, BundlerHooks, ConcatBundler, SourceKind};
pub use config::Config;
pub use constants::*;
pub use container::{Container, Manifest};
pub use error::{Error, Result};
pub use file::{FileAccessor, FileKind, FileValue, MediaHandle, MediaKind};
pub use loader::{ArtifactSource, FileSource, LoadOptions, LoadedArtifact, Loader, MemorySource};
pub use pack::{
    Export, Exports, FnPack, ModuleLoader, NativeRegistry, PackApi, PackContext, PackId,
    PackModule, PackResolver, Variant,
};
pub use packager::{Artifact, PackageOptions, Packager};
pub use session::{GameInit, HeadlessHost, Host, Icon, MountPoint, Session};
pub use storage::{FileStore, KeyValueStore, MemoryStore, ScopedStorage};
pub use vfs::Vfs;
