//! Per-file reconstruction of a merged layer tree.
//!
//! The intra-layer merge records, for every node, which source file put it
//! there. Write-back inverts that: for each source file, rebuild the JSON
//! text of its own contribution from the layer tree, then compare digests so
//! untouched files are never rewritten. A file whose whole contribution is
//! gone renders as `{}`; files are never deleted here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::dom::{path, DomTree, NodeId, NodeKind};
use crate::layer::{LayerMergeResult, LoadedLayer, SourceFile};

/// One planned file update.
#[derive(Debug, Clone, Serialize)]
pub struct FileWrite {
    /// Absolute path to write.
    pub path: PathBuf,
    /// Layer-relative path, forward slashes.
    pub relative: String,
    /// Canonical rendering of the file's contribution.
    pub text: String,
    /// True when `text` differs from the bytes currently on disk.
    pub changed: bool,
}

/// Plan the write-back of one layer. Files whose parsed root was not an
/// Object never merged, so they are left alone.
#[instrument(skip_all, fields(layer = %layer.definition.name))]
pub fn plan_layer_writes(layer: &LoadedLayer, merge: &LayerMergeResult) -> Vec<FileWrite> {
    let mut writes = Vec::with_capacity(layer.files.len());
    for file in &layer.files {
        if !file.root.is_object() {
            continue;
        }
        let text = render_contribution(file, &merge.merged, &merge.origins);
        let changed = hex::encode(blake3::hash(text.as_bytes()).as_bytes()) != file.digest;
        if changed {
            debug!(file = %file.relative, "contribution differs from disk");
        }
        writes.push(FileWrite {
            path: file.absolute.clone(),
            relative: file.relative.clone(),
            text,
            changed,
        });
    }
    writes
}

/// Rebuild the JSON text a file should contain: the children of its mount
/// node, filtered down to nodes this file originated.
fn render_contribution(
    file: &SourceFile,
    tree: &DomTree,
    origins: &BTreeMap<String, String>,
) -> String {
    let mount = path::from_segments(file.mount_segments().iter().map(String::as_str));
    let value = match tree.lookup(&mount) {
        Some(id) if tree.kind(id).is_object() => {
            contribution(tree, id, &file.relative, origins)
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
        }
        // Mount gone or no longer an Object: nothing left to own.
        _ => serde_json::Value::Object(serde_json::Map::new()),
    };
    let mut text = serde_json::to_string_pretty(&value).expect("JSON value always renders");
    text.push('\n');
    text
}

/// The part of the subtree at `id` owned by `file`. Containers another file
/// created are kept only while they hold something of ours; non-Object
/// subtrees belong wholly to their origin file.
fn contribution(
    tree: &DomTree,
    id: NodeId,
    file: &str,
    origins: &BTreeMap<String, String>,
) -> Option<serde_json::Value> {
    let owned = origins.get(&tree.path(id)).map(String::as_str) == Some(file);
    match tree.kind(id) {
        NodeKind::Object { children } => {
            let mut map = serde_json::Map::new();
            for child in children {
                if let Some(value) = contribution(tree, *child, file, origins) {
                    map.insert(tree.name(*child).to_string(), value);
                }
            }
            if owned || !map.is_empty() {
                Some(serde_json::Value::Object(map))
            } else {
                None
            }
        }
        NodeKind::Array { .. } | NodeKind::Value(_) | NodeKind::Ref { .. } => {
            owned.then(|| tree.to_json(id))
        }
    }
}
