//! # Container Codec
//!
//! Encodes a bundle plus a list of assets into the artifact wire format and
//! back.
//!
//! ## Wire Format
//!
//! ```text
//! artifact  = zlib( zip_store( entries ) )
//!
//! entries   "0" → manifest bytes   FORMAT_VERSION|/path/a|/path/b|...
//!           "1" → bundle bytes
//!           "2" → bytes of /path/a  (manifest element 1)
//!           "3" → bytes of /path/b  (manifest element 2)
//!           ...
//! ```
//!
//! The archive stores entries uncompressed; compression happens once over
//! the whole archive. Asset key `k` maps to manifest element `k - 1`, i.e.
//! to `paths[k - 2]`. The mapping is positional, never by content.
//!
//! ## Known Constraint
//!
//! Manifest elements are joined with [`MANIFEST_DELIMITER`] without
//! escaping. A path containing the delimiter decodes to the wrong paths.
//! Encoding logs a warning for such paths but does not alter them.
//!
//! ## Resource Bounds
//!
//! Decoding enforces [`MAX_ARTIFACT_SIZE`] on the compressed input,
//! [`MAX_INFLATED_SIZE`] while inflating, and [`MAX_ARCHIVE_ENTRIES`] on
//! the archive directory.

use crate::constants::{
    BUNDLE_KEY, FIRST_ASSET_KEY, FORMAT_VERSION, MANIFEST_DELIMITER, MANIFEST_KEY,
    MAX_ARCHIVE_ENTRIES, MAX_ARTIFACT_SIZE, MAX_INFLATED_SIZE,
};
use crate::error::{Error, Result};
use crate::vfs::Vfs;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

// =============================================================================
// Manifest
// =============================================================================

/// Ordered list of asset paths, tagged with the format version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    version: String,
    paths: Vec<String>,
}

impl Manifest {
    /// Creates a manifest for the current format version.
    pub fn new(paths: Vec<String>) -> Self {
        Self::with_version(FORMAT_VERSION, paths)
    }

    /// Creates a manifest with an explicit version tag.
    pub fn with_version(version: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            version: version.into(),
            paths,
        }
    }

    /// Returns the format version tag (manifest element 0).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the asset paths (manifest elements 1..).
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Returns the original path for a container key, if the key is an
    /// asset key with a manifest entry.
    pub fn path_for_key(&self, key: usize) -> Option<&str> {
        let index = key.checked_sub(FIRST_ASSET_KEY)?;
        self.paths
            .get(index)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Serializes to the delimited wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.version.clone();
        for path in &self.paths {
            out.push(MANIFEST_DELIMITER);
            out.push_str(path);
        }
        out.into_bytes()
    }

    /// Parses the delimited wire form.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);
        let mut parts = text.split(MANIFEST_DELIMITER);

        let version = parts.next().unwrap_or_default().to_string();
        if version.is_empty() {
            return Err(Error::InvalidManifest("missing format version".to_string()));
        }

        Ok(Self {
            version,
            paths: parts.map(str::to_string).collect(),
        })
    }
}

// =============================================================================
// Container
// =============================================================================

/// Decoded contents of an artifact.
#[derive(Debug, Clone)]
pub struct Container {
    /// Version tag plus asset paths.
    pub manifest: Manifest,
    /// Bundler output.
    pub bundle: Vec<u8>,
    /// Assets in manifest order.
    pub assets: Vec<(String, Arc<[u8]>)>,
}

impl Container {
    /// Assembles a container, deriving the manifest from the asset order.
    pub fn new(bundle: Vec<u8>, assets: Vec<(String, Arc<[u8]>)>) -> Self {
        for (path, _) in &assets {
            if path.contains(MANIFEST_DELIMITER) {
                warn!(
                    "Asset path {} contains the manifest delimiter '{}'; it will not decode correctly",
                    path, MANIFEST_DELIMITER
                );
            }
        }

        let manifest = Manifest::new(assets.iter().map(|(path, _)| path.clone()).collect());
        Self {
            manifest,
            bundle,
            assets,
        }
    }

    /// Returns the bundle as text.
    pub fn bundle_text(&self) -> String {
        String::from_utf8_lossy(&self.bundle).into_owned()
    }

    /// Builds a virtual filesystem holding the assets.
    pub fn to_vfs(&self) -> Vfs {
        let mut vfs = Vfs::new();
        for (path, data) in &self.assets {
            vfs.add_file(path, data.to_vec());
        }
        vfs
    }

    /// Encodes into the final compressed artifact bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let archive = self.to_archive()?;
        let compressed = compress(&archive)?;
        debug!(
            "Encoded container: {} assets, archive {} bytes, artifact {} bytes",
            self.assets.len(),
            archive.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    /// Decodes compressed artifact bytes.
    pub fn decode(artifact: &[u8]) -> Result<Self> {
        let archive = decompress(artifact)?;
        Self::from_archive(&archive)
    }

    /// Writes the store-only archive (before whole-buffer compression).
    pub fn to_archive(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let manifest = self.manifest.to_bytes();
        let structural = [(MANIFEST_KEY, &manifest[..]), (BUNDLE_KEY, &self.bundle[..])];
        let assets = self
            .assets
            .iter()
            .enumerate()
            .map(|(i, (_, data))| (FIRST_ASSET_KEY + i, &data[..]));

        for (key, data) in structural.into_iter().chain(assets) {
            writer
                .start_file(key.to_string(), options)
                .map_err(|e| Error::InvalidArchive(e.to_string()))?;
            writer.write_all(data)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::InvalidArchive(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Reads a store-only archive.
    ///
    /// Keys `0` and `1` are structural and required. Every other key is an
    /// asset looked up in the manifest by position; keys that are not
    /// numeric or have no manifest entry are skipped with a warning.
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::InvalidArchive(e.to_string()))?;

        if archive.len() > MAX_ARCHIVE_ENTRIES {
            return Err(Error::InvalidArchive(format!(
                "too many entries: {} > {}",
                archive.len(),
                MAX_ARCHIVE_ENTRIES
            )));
        }

        let mut manifest_bytes = None;
        let mut bundle = None;
        let mut raw_assets: Vec<(usize, Vec<u8>)> = Vec::new();

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::InvalidArchive(e.to_string()))?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| Error::InvalidArchive(format!("entry {}: {}", name, e)))?;

            match name.parse::<usize>() {
                Ok(MANIFEST_KEY) => manifest_bytes = Some(data),
                Ok(BUNDLE_KEY) => bundle = Some(data),
                Ok(key) => raw_assets.push((key, data)),
                Err(_) => warn!("Skipping non-numeric archive entry: {}", name),
            }
        }

        let manifest = manifest_bytes
            .ok_or_else(|| Error::InvalidManifest("archive has no manifest entry".to_string()))
            .and_then(|bytes| Manifest::parse(&bytes))?;
        let bundle =
            bundle.ok_or_else(|| Error::InvalidArchive("archive has no bundle entry".to_string()))?;

        raw_assets.sort_by_key(|(key, _)| *key);

        let mut assets = Vec::with_capacity(raw_assets.len());
        for (key, data) in raw_assets {
            match manifest.path_for_key(key) {
                Some(path) => assets.push((path.to_string(), Arc::from(data))),
                None => warn!("Archive entry {} has no manifest path, skipping", key),
            }
        }

        Ok(Self {
            manifest,
            bundle,
            assets,
        })
    }
}

// =============================================================================
// Whole-Artifact Compression
// =============================================================================

/// Compresses archive bytes with zlib at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Compression(format!("write error: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Error::Compression(format!("finish error: {}", e)))
}

/// Inflates artifact bytes, enforcing the size bounds.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > MAX_ARTIFACT_SIZE {
        return Err(Error::ArtifactTooLarge {
            size: data.len() as u64,
            limit: MAX_ARTIFACT_SIZE as u64,
        });
    }

    // Read one byte past the limit so an oversized stream is detectable.
    let mut decoder = ZlibDecoder::new(data).take(MAX_INFLATED_SIZE + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Compression(format!("decompression error: {}", e)))?;

    if out.len() as u64 > MAX_INFLATED_SIZE {
        return Err(Error::ArtifactTooLarge {
            size: out.len() as u64,
            limit: MAX_INFLATED_SIZE,
        });
    }

    Ok(out)
}
