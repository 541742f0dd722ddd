//! Image store - one PNG per file key, remembered across restarts
//!
//! The directory an image was written to is recorded in the path index
//! under its file key. A fresh store for the same key finds the image again
//! without being told where it lives.
//!
//! Nothing here fails loudly: I/O errors are logged and read back as "not
//! found" or as a `false` return.

use crate::store::index::PathIndex;
use crate::store::root::StorageRoot;
use crate::{Lookup, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stores a single image under `<root>/<dir_name>/<file_name>`
pub struct ImageStore {
    storage: StorageRoot,
    index: Arc<dyn PathIndex>,
    dir_name: String,
    file_name: String,
    /// Last directory the file was written to; empty when unknown
    path: String,
}

impl ImageStore {
    /// Create a store, recovering the last known directory from the index.
    ///
    /// The recovered directory is not checked against the filesystem.
    pub fn new(storage: &StorageRoot, dir_name: &str, file_name: &str) -> Self {
        let index = storage.index();
        let path = index.get(file_name).unwrap_or_default();

        ImageStore {
            storage: storage.clone(),
            index,
            dir_name: dir_name.to_string(),
            file_name: file_name.to_string(),
            path,
        }
    }

    /// Write the image as PNG, replacing any previous file.
    ///
    /// The index is only updated once the file is fully written.
    pub fn save(&mut self, image: &DynamicImage) -> bool {
        let dir = match self.write(image) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(
                    dir_name = %self.dir_name,
                    file_name = %self.file_name,
                    error = %e,
                    "failed to save image"
                );
                return false;
            }
        };

        self.path = dir.to_string_lossy().into_owned();
        if let Err(e) = self.index.put(&self.file_name, &self.path) {
            warn!(
                file_name = %self.file_name,
                path = %self.path,
                error = %e,
                "image saved but its location was not recorded"
            );
        }
        debug!(file_name = %self.file_name, path = %self.path, "saved image");
        true
    }

    fn write(&self, image: &DynamicImage) -> Result<PathBuf> {
        let dir = self.storage.dir(&self.dir_name)?;
        let target = dir.join(&self.file_name);
        let staging = dir.join(format!(".{}.tmp", self.file_name));

        if let Err(e) = write_png(&staging, image) {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
        std::fs::rename(&staging, &target)?;
        Ok(dir)
    }

    /// Decode the stored image, `None` if there is none or it is unreadable
    pub fn load(&self) -> Option<DynamicImage> {
        self.lookup().into_option()
    }

    /// Like `load`, but tells a missing file from a failed read
    pub fn lookup(&self) -> Lookup<DynamicImage> {
        let Some(path) = self.file_path() else {
            debug!(file_name = %self.file_name, "no recorded location for image");
            return Lookup::Absent;
        };

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "image file not found");
                return Lookup::Absent;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open image");
                return Lookup::Failed(e.to_string());
            }
        };

        match image::load(BufReader::new(file), ImageFormat::Png) {
            Ok(image) => Lookup::Found(image),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to decode image");
                Lookup::Failed(e.to_string())
            }
        }
    }

    /// Whether a file exists at the recorded location, without decoding it
    pub fn exists(&self) -> bool {
        self.file_path().is_some_and(|path| path.is_file())
    }

    /// Delete the stored file and forget its location
    pub fn remove(&mut self) -> bool {
        if let Some(path) = self.file_path() {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove image");
                    return false;
                }
            }
        }
        if let Err(e) = self.index.remove(&self.file_name) {
            warn!(file_name = %self.file_name, error = %e, "failed to drop index entry");
            return false;
        }
        self.path.clear();
        true
    }

    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Last known directory of the image; empty when never saved
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full path of the image file, if its directory is known
    pub fn file_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() {
            None
        } else {
            Some(Path::new(&self.path).join(&self.file_name))
        }
    }
}

/// Encode losslessly at best compression; the file is closed on every path
fn write_png(path: &Path, image: &DynamicImage) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let encoder =
        PngEncoder::new_with_quality(&mut writer, CompressionType::Best, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::store::index::MemoryIndex;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn sample_image() -> DynamicImage {
        let mut img = RgbaImage::new(4, 3);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([x as u8 * 40, y as u8 * 60, 200, 255]);
        }
        DynamicImage::ImageRgba8(img)
    }

    fn memory_root(dir: &Path) -> StorageRoot {
        StorageRoot::with_index(dir, Arc::new(MemoryIndex::new())).unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let root = memory_root(dir.path());
        let mut store = ImageStore::new(&root, "tests", "photo_0.png");

        assert!(!store.exists());
        assert!(store.load().is_none());
        assert_eq!(store.path(), "");

        let image = sample_image();
        assert!(store.save(&image));
        assert!(store.exists());
        assert_eq!(store.path(), root.path().join("tests").to_string_lossy());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.to_rgba8(), image.to_rgba8());
    }

    #[test]
    fn test_location_survives_new_instance() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path());

        {
            let root = StorageRoot::open(&config).unwrap();
            let mut store = root.image_store("tests", "photo_1.png");
            assert!(store.save(&sample_image()));
        }

        let root = StorageRoot::open(&config).unwrap();
        let store = root.image_store("tests", "photo_1.png");
        assert!(store.exists());
        assert_eq!(store.load().unwrap().to_rgba8(), sample_image().to_rgba8());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let root = memory_root(dir.path());
        let mut store = root.image_store("tests", "photo.png");

        assert!(store.save(&sample_image()));
        let gray = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])));
        assert!(store.save(&gray));

        assert_eq!(store.load().unwrap().to_rgba8(), gray.to_rgba8());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("tests"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_failed_save_keeps_index_untouched() {
        let dir = tempdir().unwrap();
        let root = memory_root(dir.path());
        // A plain file where the directory should be
        std::fs::write(dir.path().join("blocked"), b"x").unwrap();

        let mut store = root.image_store("blocked", "photo.png");
        assert!(!store.save(&sample_image()));
        assert_eq!(store.path(), "");
        assert_eq!(root.index().get("photo.png"), None);
        assert!(!store.exists());
    }

    #[test]
    fn test_stale_location_reads_as_absent() {
        let dir = tempdir().unwrap();
        let root = memory_root(dir.path());
        root.index()
            .put("ghost.png", &dir.path().join("gone").to_string_lossy())
            .unwrap();

        let store = root.image_store("tests", "ghost.png");
        assert!(!store.path().is_empty());
        assert!(!store.exists());
        assert_eq!(store.lookup(), Lookup::Absent);
    }

    #[test]
    fn test_corrupted_file_reads_as_failure() {
        let dir = tempdir().unwrap();
        let root = memory_root(dir.path());
        let mut store = root.image_store("tests", "photo.png");
        assert!(store.save(&sample_image()));

        std::fs::write(store.file_path().unwrap(), b"not a png").unwrap();
        assert!(store.exists());
        assert!(matches!(store.lookup(), Lookup::Failed(_)));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let root = memory_root(dir.path());
        let mut store = root.image_store("tests", "photo.png");
        assert!(store.save(&sample_image()));

        assert!(store.remove());
        assert!(!store.exists());
        assert_eq!(store.path(), "");
        assert_eq!(root.index().get("photo.png"), None);
        assert_eq!(store.dir_name(), "tests");
        assert_eq!(store.file_name(), "photo.png");
    }
}
