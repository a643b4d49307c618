//! # Artifact Format Constants
//!
//! Defines the wire-format tags, conventional paths, and resource limits for
//! the build → artifact → load pipeline. These constants are the **single
//! source of truth** for values shared between the packager (build time)
//! and the loader (run time); changing any of the format constants breaks
//! compatibility with previously packaged artifacts.
//!
//! ## Cross-References
//!
//! - [`crate::container`]: Uses the manifest delimiter, container keys and size limits
//! - [`crate::packager`]: Uses the config path, external namespace and artifact extension
//! - [`crate::pack::resolver`]: Uses the packs root and identifier validation
//! - [`crate::storage`]: Uses the storage key prefix

// =============================================================================
// Artifact Format
// =============================================================================
//
// An artifact is the zlib-compressed bytes of a store-only zip archive whose
// entries are named "0", "1", "2", ... with no gaps:
//
//   "0"  manifest (FORMAT_VERSION | path | path | ...)
//   "1"  bundle output
//   "2"+ assets, positionally aligned to manifest paths
// =============================================================================

/// Format version written as manifest element 0.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Delimiter between manifest elements.
///
/// **Constraint**: asset paths must not contain this character. It is not
/// escaped; a path containing it shifts every later manifest position.
pub const MANIFEST_DELIMITER: char = '|';

/// Container key of the manifest entry.
pub const MANIFEST_KEY: usize = 0;

/// Container key of the bundle entry.
pub const BUNDLE_KEY: usize = 1;

/// First container key holding an asset.
pub const FIRST_ASSET_KEY: usize = 2;

/// File extension of packaged artifacts (without the dot).
pub const ARTIFACT_EXTENSION: &str = "vortex";

/// File name the bundler writes its single output to.
pub const BUNDLE_OUTFILE: &str = "bundle.js";

// =============================================================================
// Build-Time Paths
// =============================================================================

/// Location of the project config inside the virtual filesystem.
pub const CONFIG_PATH: &str = "/vortex.json";

/// Import prefix for libraries provided by the runtime.
///
/// Specifiers under this namespace are left to the runtime to resolve and
/// are exempt from scripts-root confinement.
pub const EXTERNAL_NAMESPACE: &str = "/lib/";

/// Default game name when the config omits one.
pub const DEFAULT_GAME_NAME: &str = "Untitled Game";

/// Default scripts root when the config omits one.
pub const DEFAULT_SCRIPTS_ROOT: &str = "/scripts/";

/// Default entry file, relative to the scripts root.
pub const DEFAULT_ENTRY: &str = "main.ts";

// =============================================================================
// Run-Time Paths
// =============================================================================

/// Directory holding embedded pack modules in the virtual filesystem.
pub const PACKS_ROOT: &str = "/packs";

/// Entry file name of a pack module.
pub const PACK_ENTRY_FILE: &str = "index.js";

/// Prefix of every derived storage key.
pub const STORAGE_KEY_PREFIX: &str = "Vortex";

// =============================================================================
// Size Limits
// =============================================================================
//
// Artifacts are fetched from arbitrary locations and inflated in memory.
// These bounds stop a small compressed artifact from expanding without limit.
// =============================================================================

/// Maximum compressed artifact size (256 MiB).
///
/// **Security**: Checked before inflation begins.
pub const MAX_ARTIFACT_SIZE: usize = 256 * 1024 * 1024;

/// Maximum inflated archive size (1 GiB).
///
/// **Security**: Enforced while inflating, so compression bombs are cut off
/// after at most this many bytes.
///
/// **Attack Vector**: Small compressed, huge uncompressed.
pub const MAX_INFLATED_SIZE: u64 = 1024 * 1024 * 1024;

/// Maximum number of entries in an artifact archive.
///
/// **Security**: Bounds central-directory parsing and VFS growth.
pub const MAX_ARCHIVE_ENTRIES: usize = 100_000;

// =============================================================================
// Pack Identifier Validation
// =============================================================================

/// Valid characters for a pack identifier segment.
///
/// Includes: `a-z`, `A-Z`, `0-9`, `-`, `_`
///
/// **Security**: Excludes `/` and `.` inside segments, so an identifier can
/// never name a path outside [`PACKS_ROOT`].
pub const PACK_SEGMENT_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Maximum pack identifier length.
pub const MAX_PACK_ID_LEN: usize = 128;

/// Validates a dot-separated pack identifier such as `Vortex.Input`.
///
/// # Returns
///
/// `Ok(())` if valid, `Err(reason)` with a description of the failure.
#[inline]
#[must_use = "validation result must be checked before using the identifier in a path"]
pub fn validate_pack_id(id: &str) -> std::result::Result<(), &'static str> {
    if id.is_empty() {
        return Err("pack id cannot be empty");
    }
    if id.len() > MAX_PACK_ID_LEN {
        return Err("pack id exceeds maximum length");
    }
    for segment in id.split('.') {
        if segment.is_empty() {
            return Err("pack id contains an empty segment");
        }
        if !segment.chars().all(|c| PACK_SEGMENT_VALID_CHARS.contains(c)) {
            return Err("pack id contains invalid characters");
        }
    }
    Ok(())
}
