//! Image persistence
//!
//! Images are written as PNG files under named subdirectories of a storage
//! root. A small JSON index remembers where each file key was last written.

mod image_store;
mod index;
mod root;

pub use image_store::ImageStore;
pub use index::{JsonFileIndex, MemoryIndex, PathIndex};
pub use root::StorageRoot;
