//! Error types for packaging, loading, and pack resolution.

use std::path::PathBuf;

/// Result type alias for vortex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the build → artifact → load pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Virtual Filesystem Errors
    // =========================================================================
    /// File does not exist in the virtual filesystem.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    // =========================================================================
    // Build Errors
    // =========================================================================
    /// `/vortex.json` could not be parsed. Recovered by falling back to
    /// defaults; only ever rendered into a warning.
    #[error("failed to parse {path}: {reason}")]
    ConfigParse { path: String, reason: String },

    /// A script import resolved outside the configured scripts root.
    #[error("import {import} escapes scripts root {root} (resolved to {resolved})")]
    ConfinementViolation {
        import: String,
        resolved: String,
        root: String,
    },

    /// The bundler reported one or more errors.
    #[error("build failed: {}", messages.join(", "))]
    BuildFailed { messages: Vec<String> },

    // =========================================================================
    // Artifact Errors
    // =========================================================================
    /// The store-only archive could not be written or read.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The manifest entry is missing or malformed.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Whole-artifact compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Artifact exceeds a size bound.
    #[error("artifact exceeds size limit: {size} > {limit} bytes")]
    ArtifactTooLarge { size: u64, limit: u64 },

    /// Artifact bytes do not hash to the expected digest.
    #[error("artifact digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: String, computed: String },

    /// Artifact could not be written to disk.
    #[error("failed to write artifact to {path}: {reason}")]
    ArtifactWriteFailed { path: PathBuf, reason: String },

    // =========================================================================
    // Pack Errors
    // =========================================================================
    /// Pack identifier is malformed.
    #[error("invalid pack id '{id}': {reason}")]
    InvalidPackId { id: String, reason: &'static str },

    /// A pack was acquired while its own module was still being resolved.
    #[error("circular dependency detected for pack {id}")]
    CircularDependency { id: String },

    /// The pack module lacks the export required for the requested variant.
    #[error("pack {id} missing {export} export")]
    MissingExport { id: String, export: String },

    /// The module loader could not produce a module for the pack.
    #[error("failed to load pack {id}: {reason}")]
    PackLoadFailed { id: String, reason: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Key-value storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

