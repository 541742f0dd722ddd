//! Error types for corpus_store

use thiserror::Error;

/// Result type alias for corpus_store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in corpus_store operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Outcome of reading an optional piece of data.
///
/// `Absent` is the normal result of an optional field or a missing file.
/// `Failed` means the underlying medium rejected the read. Public accessors
/// collapse both to `None`; the distinction only survives in the logs.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Drop the absent/failed distinction
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent | Lookup::Failed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Absent => Lookup::Absent,
            Lookup::Failed(detail) => Lookup::Failed(detail),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_collapses_to_option() {
        assert_eq!(Lookup::Found(3).into_option(), Some(3));
        assert_eq!(Lookup::<i32>::Absent.into_option(), None);
        assert_eq!(Lookup::<i32>::Failed("disk".into()).into_option(), None);
    }

    #[test]
    fn test_lookup_map_keeps_failure() {
        let failed: Lookup<i32> = Lookup::Failed("denied".into());
        assert_eq!(failed.map(|v| v * 2), Lookup::Failed("denied".into()));
        assert!(Lookup::Found(2).map(|v| v * 2).is_found());
    }
}
