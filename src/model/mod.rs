//! Core data model types for corpus_store

mod document;
mod element;

pub use document::{keys, Document};
pub use element::{TestElement, CONFIDENCE_SENTINEL};
