//! # corpus_store
//!
//! Records and images of an OCR test corpus.
//!
//! Each test pairs a picture with a JSON document of annotated facts
//! (ingredients, tags, notes, recognition confidence, recognized text) and
//! any number of named alterations: derived variants of the picture that
//! carry the same facts for their own recognition run.
//!
//! ## Core Concepts
//!
//! - **TestElement**: typed, failure-tolerant view over one document and its pictures
//! - **ImageStore**: one PNG per file key, whose directory is remembered across restarts
//! - **StorageRoot**: base directory and persistent path index shared by image stores
//!
//! ## Example
//!
//! ```ignore
//! use corpus_store::{StorageConfig, StorageRoot, TestElement};
//!
//! let mut test = TestElement::from_json_str(None, r#"{"confidence":"0.87"}"#, "photo_0")?;
//! assert_eq!(test.confidence(), 0.87);
//!
//! let root = StorageRoot::open(&StorageConfig::from_env()?)?;
//! let mut store = root.image_store("tests", "photo_0.png");
//! store.save(&picture);
//! ```

pub mod config;
pub mod corpus;
pub mod model;
pub mod store;

mod error;

pub use config::StorageConfig;
pub use corpus::Corpus;
pub use error::{Error, Lookup, Result};
pub use model::{keys, Document, TestElement, CONFIDENCE_SENTINEL};
pub use store::{ImageStore, JsonFileIndex, MemoryIndex, PathIndex, StorageRoot};
