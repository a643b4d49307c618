//! Project configuration (`/vortex.json`).
//!
//! Loaded once per build from the virtual filesystem. Every key is optional
//! and the loader is forgiving: an absent file yields defaults, and a file
//! that fails to parse yields defaults plus a warning.

use crate::constants::{
    ARTIFACT_EXTENSION, CONFIG_PATH, DEFAULT_ENTRY, DEFAULT_GAME_NAME, DEFAULT_SCRIPTS_ROOT,
};
use crate::error::{Error, Result};
use crate::vfs::Vfs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Build configuration for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Display name of the game; also names the artifact.
    pub name: String,
    /// Directory holding scripts. Always `/`-prefixed and `/`-suffixed after
    /// [`Config::load`].
    pub scripts_root: String,
    /// Entry script, relative to `scripts_root`.
    pub entry: String,
    /// Substrings; any VFS path containing one is left out of the artifact.
    pub ignore: Vec<String>,
    /// Packs the project declares. Reserved.
    pub packs: Vec<Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DEFAULT_GAME_NAME.to_string(),
            scripts_root: DEFAULT_SCRIPTS_ROOT.to_string(),
            entry: DEFAULT_ENTRY.to_string(),
            ignore: Vec::new(),
            packs: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the config from [`CONFIG_PATH`], falling back to defaults.
    ///
    /// Never fails: parse errors are logged and recovered from.
    pub fn load(vfs: &Vfs) -> Self {
        let mut config = match vfs.read_file(CONFIG_PATH) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("{}, using defaults", e);
                Self::default()
            }),
            Err(_) => {
                debug!("No {} found, using defaults", CONFIG_PATH);
                Self::default()
            }
        };

        config.scripts_root = Self::normalize_root(&config.scripts_root);
        config
    }

    /// Parses config JSON, merging it over the defaults key by key.
    ///
    /// The document must be a JSON object. Keys absent from it keep their
    /// defaults, and so do keys whose value has the wrong type (with a
    /// warning). Unknown keys are ignored.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let document: Map<String, Value> =
            serde_json::from_slice(content).map_err(|e| Error::ConfigParse {
                path: CONFIG_PATH.to_string(),
                reason: e.to_string(),
            })?;

        let mut config = Self::default();
        for (key, value) in document {
            let merged = match key.as_str() {
                "name" => merge(&mut config.name, value),
                "scriptsRoot" => merge(&mut config.scripts_root, value),
                "entry" => merge(&mut config.entry, value),
                "ignore" => merge(&mut config.ignore, value),
                "packs" => merge(&mut config.packs, value),
                _ => Ok(()),
            };
            if let Err(e) = merged {
                warn!("{}: ignoring key '{}' ({}), keeping default", CONFIG_PATH, key, e);
            }
        }
        Ok(config)
    }

    /// Ensures a scripts root has both a leading and trailing slash.
    ///
    /// Only the ends are touched; interior segments are kept as written.
    pub fn normalize_root(root: &str) -> String {
        let mut root = root.to_string();
        if !root.starts_with('/') {
            root.insert(0, '/');
        }
        if !root.ends_with('/') {
            root.push('/');
        }
        root
    }

    /// Returns the artifact file name: the game name with all whitespace
    /// removed, plus the artifact extension.
    pub fn artifact_name(&self) -> String {
        let stem: String = self.name.split_whitespace().collect();
        format!("{}.{}", stem, ARTIFACT_EXTENSION)
    }

    /// Returns true if `path` matches any ignore pattern.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore.iter().any(|pattern| path.contains(pattern.as_str()))
    }
}

fn merge<T: DeserializeOwned>(slot: &mut T, value: Value) -> serde_json::Result<()> {
    *slot = serde_json::from_value(value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse(br#"{"name": "Foo Bar"}"#).unwrap();
        assert_eq!(config.name, "Foo Bar");
        assert_eq!(config.entry, DEFAULT_ENTRY);
        assert_eq!(config.scripts_root, DEFAULT_SCRIPTS_ROOT);
    }

    #[test]
    fn test_mistyped_key_keeps_other_keys() {
        let config = Config::parse(br#"{"name": "Foo Bar", "packs": {}, "entry": 7}"#).unwrap();
        assert_eq!(config.name, "Foo Bar");
        assert!(config.packs.is_empty());
        assert_eq!(config.entry, DEFAULT_ENTRY);
    }

    #[test]
    fn test_non_object_document_rejected() {
        assert!(matches!(
            Config::parse(b"[1, 2]"),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(Config::normalize_root("scripts"), "/scripts/");
        assert_eq!(Config::normalize_root("/scripts"), "/scripts/");
        assert_eq!(Config::normalize_root("scripts/"), "/scripts/");
        assert_eq!(Config::normalize_root("/src/game/"), "/src/game/");
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let mut vfs = Vfs::new();
        vfs.add_file(CONFIG_PATH, "{not json");
        assert_eq!(Config::load(&vfs), Config::default());
    }

    #[test]
    fn test_artifact_name_strips_whitespace() {
        let config = Config {
            name: "Foo Bar\tBaz".to_string(),
            ..Default::default()
        };
        assert_eq!(config.artifact_name(), "FooBarBaz.vortex");
    }

    #[test]
    fn test_ignore_is_substring_match() {
        let config = Config {
            ignore: vec![".psd".to_string(), "/raw/".to_string()],
            ..Default::default()
        };
        assert!(config.is_ignored("/assets/logo.psd"));
        assert!(config.is_ignored("/raw/sound.wav"));
        assert!(!config.is_ignored("/assets/logo.png"));
    }
}
