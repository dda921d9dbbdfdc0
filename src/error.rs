//! Error types for the layered configuration engine.
//!
//! Only genuinely unrecoverable conditions surface as [`LoadError`]. Everything
//! a merge, resolve, or validate pass can recover from is accumulated inside
//! result objects (`LayerIssue`, `ReferenceError`, `ValidationIssue`,
//! `IntegrityWarning`) and returned, never thrown across a stage boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Hard failures that abort a load or refresh.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Layer folder not found: {0}")]
    LayerFolderMissing(PathBuf),

    #[error("Project manifest error at {path}: {detail}")]
    Manifest { path: PathBuf, detail: String },

    #[error(
        "File paths differ only by letter case: {first} vs {second}; \
         file identity is ambiguous on case-insensitive file systems"
    )]
    CaseCollision { first: String, second: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<config::ConfigError> for LoadError {
    fn from(err: config::ConfigError) -> Self {
        LoadError::Settings(err.to_string())
    }
}

/// Errors from DOM tree construction and mutation.
///
/// These indicate programmer errors (bad indices, duplicate keys), not bad
/// input data, so DOM operations return them instead of panicking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Object already has a child named '{0}' (case-insensitive)")]
    DuplicateKey(String),

    #[error("Object has no child named '{0}'")]
    MissingChild(String),

    #[error("Node is not an Object")]
    NotAnObject,

    #[error("Node is not an Array")]
    NotAnArray,

    #[error("Array index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}
