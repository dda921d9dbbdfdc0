//! Layer loading and intra-layer merge.
//!
//! A layer is a directory of `*.json` files. Loading scans the directory,
//! parses every file, and hands the sorted file list to the merger, which
//! folds them into one per-layer tree and records which file contributed
//! every node. Problems short of a hard failure are accumulated as
//! [`LayerIssue`]s; only conditions that make file identity itself ambiguous
//! abort the load (see [`crate::error::LoadError`]).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dom::DomTree;

pub mod merge;
pub mod source;

pub use merge::merge_layer;
pub use source::{load_layer, SourceFile};

/// Static description of one layer: a display name and the folder its files
/// live under. Order among definitions is priority order, lowest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub name: String,
    pub folder: PathBuf,
}

impl LayerDefinition {
    pub fn new(name: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        LayerDefinition {
            name: name.into(),
            folder: folder.into(),
        }
    }
}

/// A scanned and parsed layer, ready for merging. Files are sorted by
/// ascending relative path; parse failures are recorded in `issues` and the
/// affected files omitted from `files`.
#[derive(Debug)]
pub struct LoadedLayer {
    pub definition: LayerDefinition,
    pub files: Vec<SourceFile>,
    pub issues: Vec<LayerIssue>,
}

/// Accumulated, non-fatal problems from loading and merging one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind")]
pub enum LayerIssue {
    /// The file is not valid JSON; it contributes nothing.
    #[error("{file}: invalid JSON: {detail}")]
    Parse { file: String, detail: String },
    /// The file's root is not an object; it contributes nothing.
    #[error("{file}: root is {kind}, expected an object")]
    Structural {
        file: String,
        #[serde(rename = "rootKind")]
        kind: String,
    },
    /// Two files define the same non-mergeable path; the first writer kept.
    #[error("{path}: defined by both {first} and {second}; kept {first}")]
    Overlap {
        path: String,
        first: String,
        second: String,
    },
    /// One file declares the same key twice, case-insensitively; the first
    /// occurrence kept.
    #[error("{file}: duplicate key at {path}; kept the first occurrence")]
    DuplicateKey { file: String, path: String },
}

/// Output of the intra-layer merger for one layer.
#[derive(Debug, Clone)]
pub struct LayerMergeResult {
    pub layer: String,
    pub merged: DomTree,
    /// Canonical node path to the relative file path that contributed it.
    pub origins: BTreeMap<String, String>,
    pub issues: Vec<LayerIssue>,
}

impl LayerMergeResult {
    /// True when the layer may enter cascading merge: no same-layer
    /// conflicts remain.
    pub fn is_conflict_free(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| matches!(issue, LayerIssue::Overlap { .. }))
    }
}
