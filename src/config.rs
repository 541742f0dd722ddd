//! Storage configuration
//!
//! Stored as pretty JSON; a missing file means defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the storage root
pub const ROOT_ENV: &str = "CORPUS_STORE_ROOT";

/// Namespace of the persistent path index
pub const DEFAULT_INDEX_NAMESPACE: &str = "manager";

/// Where the store keeps its files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for image subdirectories and the index file
    pub root: PathBuf,
    /// Name of the index file (without extension)
    #[serde(default = "default_namespace")]
    pub index_namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_INDEX_NAMESPACE.to_string()
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StorageConfig {
            root: root.into(),
            index_namespace: default_namespace(),
        }
    }

    /// Default root (`<data dir>/corpus_store`), overridden by `CORPUS_STORE_ROOT`
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::new(PathBuf::from(root))),
            _ => Self::default_root().map(Self::new),
        }
    }

    fn default_root() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| Error::Config("Could not find a data directory".into()))?;
        Ok(base.join("corpus_store"))
    }

    /// Load config from a file, falling back to `from_env` when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::from_env();
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;
        Ok(())
    }

    /// File name of the persistent index inside the root
    pub fn index_file_name(&self) -> String {
        format!("{}.json", self.index_namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = StorageConfig::new(dir.path().join("store"));
        config.save(&path).unwrap();

        let loaded = StorageConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.index_namespace, "manager");
    }

    #[test]
    fn test_namespace_defaults_when_omitted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"root": "/tmp/corpus"}"#).unwrap();

        let loaded = StorageConfig::load(&path).unwrap();
        assert_eq!(loaded.root, PathBuf::from("/tmp/corpus"));
        assert_eq!(loaded.index_file_name(), "manager.json");
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(StorageConfig::load(&path), Err(Error::Config(_))));
    }
}
