//! Corpus directory loader
//!
//! A corpus directory holds one `<name>.json` document per test, optionally
//! next to a picture with the same stem (`<name>.png`, `<name>.jpg`...).

use crate::model::{Document, TestElement};
use crate::{Error, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Picture extensions looked up next to each document, in order
const PICTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// The tests of one corpus directory, sorted by file name
#[derive(Debug, Default)]
pub struct Corpus {
    elements: Vec<TestElement>,
}

impl Corpus {
    /// Load every document in `dir` (not recursive).
    ///
    /// Documents that cannot be read or parsed are skipped.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "corpus directory {}",
                dir.display()
            )));
        }

        let mut elements = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !has_extension(path, "json") {
                continue;
            }
            if let Some(element) = load_element(path) {
                elements.push(element);
            }
        }

        elements.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        debug!(dir = %dir.display(), count = elements.len(), "loaded corpus");
        Ok(Corpus { elements })
    }

    /// Write an element's document to `<dir>/<file_name>.json`
    pub fn save_document(element: &TestElement, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(format!("{}.json", element.file_name()));
        std::fs::write(&path, element.to_json_pretty()?)?;
        Ok(path)
    }

    pub fn get(&self, file_name: &str) -> Option<&TestElement> {
        self.elements.iter().find(|e| e.file_name() == file_name)
    }

    pub fn get_mut(&mut self, file_name: &str) -> Option<&mut TestElement> {
        self.elements.iter_mut().find(|e| e.file_name() == file_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl IntoIterator for Corpus {
    type Item = TestElement;
    type IntoIter = std::vec::IntoIter<TestElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

/// Read one document and the picture next to it
pub fn load_element(path: &Path) -> Option<TestElement> {
    let name = path.file_stem()?.to_string_lossy().into_owned();
    let document = match read_document(path) {
        Ok(document) => document,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable document");
            return None;
        }
    };
    Some(TestElement::new(load_picture(path), document, name))
}

fn read_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)?;
    Document::parse(&content)
}

/// First picture sharing the document's stem that decodes
pub fn load_picture(document_path: &Path) -> Option<DynamicImage> {
    for ext in PICTURE_EXTENSIONS {
        let candidate = document_path.with_extension(ext);
        if !candidate.is_file() {
            continue;
        }
        match image::open(&candidate) {
            Ok(picture) => return Some(picture),
            Err(e) => warn!(path = %candidate.display(), error = %e, "failed to decode picture"),
        }
    }
    None
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
