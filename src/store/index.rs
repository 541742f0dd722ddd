//! Persistent path index
//!
//! Maps a file key to the absolute directory it was last written to, so an
//! image can be found again after a restart without the caller supplying
//! its location.

use crate::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key-value store of last known directories, keyed by file key
pub trait PathIndex: Send + Sync {
    /// Last recorded directory for a key
    fn get(&self, key: &str) -> Option<String>;

    /// Record a directory for a key
    fn put(&self, key: &str, dir: &str) -> Result<()>;

    /// Forget a key
    fn remove(&self, key: &str) -> Result<()>;
}

/// Index kept in a single JSON object file
///
/// The file is the source of truth: every call re-reads it under the lock,
/// so several indexes opened on the same file never overwrite each other's
/// entries. Writes go to a staging file that is renamed over the index.
pub struct JsonFileIndex {
    path: PathBuf,
    /// Last contents read from or written to the file
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileIndex {
    /// Open the index file. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let index = JsonFileIndex {
            path: path.as_ref().to_path_buf(),
            entries: RwLock::new(BTreeMap::new()),
        };
        index.refresh(&mut index.entries.write());
        index
    }

    /// Reload the cached entries from disk. An unreadable file keeps the
    /// cache as it is.
    fn refresh(&self, entries: &mut BTreeMap<String, String>) {
        if !self.path.exists() {
            entries.clear();
            return;
        }
        match self.read_entries() {
            Ok(current) => *entries = current,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable path index");
            }
        }
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("json.tmp");
        if let Err(e) = std::fs::write(&staging, content) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    /// Apply one change to the current file contents and write them back
    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let mut entries = self.entries.write();
        self.refresh(&mut entries);

        let mut updated = entries.clone();
        if !change(&mut updated) {
            return Ok(());
        }
        self.write_entries(&updated)?;
        *entries = updated;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        let mut entries = self.entries.write();
        self.refresh(&mut entries);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PathIndex for JsonFileIndex {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.write();
        self.refresh(&mut entries);
        entries.get(key).cloned()
    }

    fn put(&self, key: &str, dir: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), dir.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

/// Index that lives only as long as the process
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathIndex for MemoryIndex {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, dir: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), dir.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
