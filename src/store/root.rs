//! Private storage root: base directory plus the persistent path index

use crate::config::StorageConfig;
use crate::store::image_store::ImageStore;
use crate::store::index::{JsonFileIndex, PathIndex};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Supplies named subdirectories and the shared path index to image stores
#[derive(Clone)]
pub struct StorageRoot {
    root: PathBuf,
    index: Arc<dyn PathIndex>,
}

impl StorageRoot {
    /// Open the root described by `config`, creating it if needed
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let root = absolute_root(&config.root)?;
        let index = JsonFileIndex::open(root.join(config.index_file_name()));
        debug!(root = %root.display(), index = %index.path().display(), "opened storage root");

        Ok(StorageRoot {
            root,
            index: Arc::new(index),
        })
    }

    /// Use `root` with a caller supplied index, creating the directory if
    /// needed
    pub fn with_index(root: impl AsRef<Path>, index: Arc<dyn PathIndex>) -> Result<Self> {
        Ok(StorageRoot {
            root: absolute_root(root.as_ref())?,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> Arc<dyn PathIndex> {
        Arc::clone(&self.index)
    }

    /// Resolve a named subdirectory, creating it if needed
    pub fn dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Image store for one file inside one named directory
    pub fn image_store(&self, dir_name: &str, file_name: &str) -> ImageStore {
        ImageStore::new(self, dir_name, file_name)
    }
}

/// Recorded locations are absolute, so the root is resolved once up front
fn absolute_root(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    Ok(std::fs::canonicalize(root)?)
}
