//! # Virtual Filesystem
//!
//! An in-memory mapping from normalized absolute paths to immutable byte
//! sequences. The same structure is used on both sides of the pipeline:
//!
//! - **Build side**: populated from the project tree ([`Vfs::from_dir`] or
//!   [`Vfs::add_file`]) and handed to the packager.
//! - **Run side**: populated once from a decoded artifact and read-only for
//!   the rest of the session.
//!
//! ## Path Model
//!
//! Every key is normalized: forward-slash delimited, `/`-prefixed, with no
//! empty, `.` or `..` segments. Backslashes are treated as separators.
//! `..` above the root clamps silently:
//!
//! ```text
//! normalize("a/b/../c")     == "/a/c"
//! normalize("../../x")      == "/x"
//! normalize("\\a\\.\\b/")   == "/a/b"
//! ```
//!
//! ## Policy-Free
//!
//! The VFS does not enforce confinement. Rejecting paths outside an allowed
//! root is the job of the packager's resolve hook (see
//! [`crate::packager::VfsPlugin`]).
//!
//! ## Enumeration Order
//!
//! Entries enumerate in insertion order. The packager relies on this: the
//! manifest lists assets exactly in VFS order.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// In-memory file store keyed by normalized absolute path.
#[derive(Debug, Clone, Default)]
pub struct Vfs {
    files: IndexMap<String, Arc<[u8]>>,
}

impl Vfs {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every regular file under `root` into a new filesystem.
    ///
    /// Paths are stored relative to `root` (so `root/scripts/main.ts`
    /// becomes `/scripts/main.ts`). Directories are walked in sorted order
    /// so the resulting enumeration order, and therefore any manifest built
    /// from it, is deterministic.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut vfs = Self::new();
        Self::walk_dir(root, root, &mut vfs)?;
        debug!("Loaded {} files from {}", vfs.len(), root.display());
        Ok(vfs)
    }

    fn walk_dir(root: &Path, dir: &Path, vfs: &mut Self) -> Result<()> {
        let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                Self::walk_dir(root, &path, vfs)?;
            } else if path.is_file() {
                let relative = path
                    .strip_prefix(root)
                    .map_err(|e| Error::Internal(e.to_string()))?;
                vfs.add_file(&relative.to_string_lossy(), fs::read(&path)?);
            }
        }

        Ok(())
    }

    /// Normalizes a path into the canonical key form.
    pub fn normalize(path: &str) -> String {
        let path = path.replace('\\', "/");
        let mut stack: Vec<&str> = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    stack.pop();
                }
                segment => stack.push(segment),
            }
        }

        format!("/{}", stack.join("/"))
    }

    /// Resolves an import specifier against the importing file.
    ///
    /// Absolute specifiers normalize directly. Relative specifiers are
    /// joined onto the importer's directory (everything before its last
    /// `/`), or onto the root when there is no importer.
    pub fn resolve(path: &str, importer: Option<&str>) -> String {
        if path.starts_with('/') {
            return Self::normalize(path);
        }

        let base = importer
            .and_then(|imp| imp.rfind('/').map(|idx| &imp[..idx]))
            .unwrap_or("");

        Self::normalize(&format!("{}/{}", base, path))
    }

    /// Adds a file, normalizing its path. Replaces any existing content.
    pub fn add_file(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        let content: Vec<u8> = content.into();
        self.files.insert(Self::normalize(path), Arc::from(content));
    }

    /// Checks whether a file exists.
    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&Self::normalize(path))
    }

    /// Reads a file.
    ///
    /// The returned buffer is shared; cloning it is cheap.
    pub fn read_file(&self, path: &str) -> Result<Arc<[u8]>> {
        self.files
            .get(&Self::normalize(path))
            .cloned()
            .ok_or_else(|| Error::FileNotFound {
                path: path.to_string(),
            })
    }

    /// Iterates over `(path, content)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<[u8]>)> {
        self.files.iter().map(|(path, content)| (path.as_str(), content))
    }

    /// Returns the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there are no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P, C> FromIterator<(P, C)> for Vfs
where
    P: AsRef<str>,
    C: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut vfs = Self::new();
        for (path, content) in iter {
            vfs.add_file(path.as_ref(), content);
        }
        vfs
    }
}
