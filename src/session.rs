//! Editor session: stateful consumer that keeps per-layer trees editable
//! and knows how to save changes back to the files they came from.
//!
//! The session owns the loaded layers and their merge results. Edits mutate
//! a layer's merged tree and its origin map directly; `refresh` re-runs
//! cascade + resolve over the edited trees (not the raw files, which would
//! discard the edits). The last successful `RefreshResult` stays current
//! until the next one commits, so a cancelled refresh loses nothing.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, instrument};

use crate::dom::{path, Fragment, NodeId, NodeKind, Scalar};
use crate::engine::{Engine, RefreshResult};
use crate::error::{DomError, LoadError};
use crate::layer::{merge_layer, LayerMergeResult, LoadedLayer};
use crate::schema::SchemaNode;
use crate::writeback::{plan_layer_writes, FileWrite};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no layer named {0:?} in this session")]
    UnknownLayer(String),
    #[error("{layer}: no path {path:?}")]
    MissingPath { layer: String, path: String },
    #[error("{layer}: cannot determine an origin file for {path:?}; the layer has no files")]
    NoAnchor { layer: String, path: String },
    #[error("{layer}: the tree root cannot be edited directly")]
    RootEdit { layer: String },
    #[error(transparent)]
    Edit(#[from] DomError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct EditorSession {
    engine: Engine,
    layers: Vec<LoadedLayer>,
    merges: Vec<LayerMergeResult>,
    schema: Option<SchemaNode>,
    result: Option<RefreshResult>,
}

impl EditorSession {
    /// Open a session over already-loaded layers; merges each one up front.
    pub fn new(engine: Engine, layers: Vec<LoadedLayer>, schema: Option<SchemaNode>) -> Self {
        let merges = layers.iter().map(merge_layer).collect();
        EditorSession {
            engine,
            layers,
            merges,
            schema,
            result: None,
        }
    }

    pub fn layers(&self) -> &[LoadedLayer] {
        &self.layers
    }

    pub fn schema(&self) -> Option<&SchemaNode> {
        self.schema.as_ref()
    }

    /// The merge result for one layer, with any in-session edits applied.
    pub fn layer_merge(&self, layer: &str) -> Option<&LayerMergeResult> {
        let index = self.index_of(layer).ok()?;
        Some(&self.merges[index])
    }

    /// The last committed pipeline result, if any refresh has run.
    pub fn result(&self) -> Option<&RefreshResult> {
        self.result.as_ref()
    }

    /// Re-run cascade + resolve over the edited layer trees and commit the
    /// outcome. On error (cancellation included) the previous result stays.
    #[instrument(skip_all)]
    pub fn refresh(&mut self) -> Result<&RefreshResult, LoadError> {
        let result = self
            .engine
            .refresh_merged(self.schema.as_ref(), self.merges.clone())?;
        Ok(self.result.insert(result))
    }

    /// Set the scalar at `path` in `layer`, creating missing Object chains.
    ///
    /// An existing node keeps its origin file (the edit goes back where the
    /// value came from). New nodes are assigned to the nearest ancestor's
    /// origin file, falling back to the layer's first source file.
    #[instrument(skip(self, scalar))]
    pub fn set_scalar(
        &mut self,
        layer: &str,
        path_expr: &str,
        scalar: Scalar,
    ) -> Result<(), SessionError> {
        let index = self.index_of(layer)?;
        let anchor_fallback = self.layers[index]
            .files
            .first()
            .map(|file| file.relative.clone());
        let merge = &mut self.merges[index];

        let segments: Vec<&str> = path::segments(path_expr).collect();
        let mut current = merge.merged.root();
        let mut found = 0;
        for segment in &segments {
            let next = match merge.merged.kind(current) {
                NodeKind::Object { .. } => merge.merged.child_by_name(current, segment),
                NodeKind::Array { .. } => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| merge.merged.item(current, index)),
                _ => None,
            };
            match next {
                Some(child) => {
                    current = child;
                    found += 1;
                }
                None => break,
            }
        }

        if found == segments.len() {
            if current == merge.merged.root() {
                return Err(SessionError::RootEdit {
                    layer: layer.to_string(),
                });
            }
            let exact = merge.merged.path(current);
            merge.merged.replace_subtree(current, &Fragment::Value(scalar));
            let buried = format!("{exact}/");
            merge.origins.retain(|recorded, _| !recorded.starts_with(&buried));
            debug!(path = %exact, "scalar replaced in place");
            return Ok(());
        }

        if !merge.merged.kind(current).is_object() {
            // Cannot grow new children under an Array or a scalar.
            return Err(SessionError::Edit(DomError::NotAnObject));
        }
        let anchor = nearest_origin(merge, current)
            .or(anchor_fallback)
            .ok_or_else(|| SessionError::NoAnchor {
                layer: layer.to_string(),
                path: path_expr.to_string(),
            })?;

        let mut parent = current;
        for (offset, segment) in segments[found..].iter().enumerate() {
            let last = found + offset == segments.len() - 1;
            let fragment = if last {
                Fragment::Value(scalar.clone())
            } else {
                Fragment::Object(Vec::new())
            };
            let id = merge.merged.insert_child(parent, segment, &fragment)?;
            merge.origins.insert(merge.merged.path(id), anchor.clone());
            parent = id;
        }
        debug!(path = path_expr, file = %anchor, "scalar created");
        Ok(())
    }

    /// Remove the node at `path` from `layer` and forget its origins.
    /// Removing an Array item renumbers the following siblings, so the whole
    /// array's origin entries are re-stamped.
    #[instrument(skip(self))]
    pub fn remove_value(&mut self, layer: &str, path_expr: &str) -> Result<(), SessionError> {
        let index = self.index_of(layer)?;
        let merge = &mut self.merges[index];
        let Some(id) = merge.merged.lookup(path_expr) else {
            return Err(SessionError::MissingPath {
                layer: layer.to_string(),
                path: path_expr.to_string(),
            });
        };
        let Some(parent) = merge.merged.parent(id) else {
            return Err(SessionError::RootEdit {
                layer: layer.to_string(),
            });
        };
        let exact = merge.merged.path(id);
        match merge.merged.kind(parent) {
            NodeKind::Object { .. } => {
                let name = merge.merged.name(id).to_string();
                merge.merged.remove_child(parent, &name);
                let buried = format!("{exact}/");
                merge
                    .origins
                    .retain(|recorded, _| recorded != &exact && !recorded.starts_with(&buried));
            }
            NodeKind::Array { .. } => {
                let array_path = merge.merged.path(parent);
                let position = merge
                    .merged
                    .items(parent)
                    .iter()
                    .position(|item| *item == id)
                    .expect("looked-up item listed in its parent");
                merge.merged.remove_item(parent, position)?;
                let file = merge.origins.get(&array_path).cloned();
                let buried = format!("{array_path}/");
                merge.origins.retain(|recorded, _| !recorded.starts_with(&buried));
                if let Some(file) = file {
                    let restamped: Vec<String> = merge
                        .merged
                        .descendants(parent)
                        .skip(1)
                        .map(|node| merge.merged.path(node))
                        .collect();
                    for recorded in restamped {
                        merge.origins.insert(recorded, file.clone());
                    }
                }
            }
            _ => {
                return Err(SessionError::Edit(DomError::NotAnObject));
            }
        }
        debug!(path = %exact, "value removed");
        Ok(())
    }

    /// Plan the write-back of one layer without touching disk.
    pub fn plan_writes(&self, layer: &str) -> Result<Vec<FileWrite>, SessionError> {
        let index = self.index_of(layer)?;
        Ok(plan_layer_writes(&self.layers[index], &self.merges[index]))
    }

    /// Write every changed file of one layer and refresh the cached digests
    /// so an immediate re-plan reports everything unchanged.
    #[instrument(skip(self))]
    pub fn apply_writes(&mut self, layer: &str) -> Result<Vec<FileWrite>, SessionError> {
        let index = self.index_of(layer)?;
        let writes = plan_layer_writes(&self.layers[index], &self.merges[index]);
        let mut applied = 0usize;
        for write in &writes {
            if !write.changed {
                continue;
            }
            fs::write(&write.path, &write.text).map_err(|source| SessionError::Io {
                path: write.path.clone(),
                source,
            })?;
            if let Some(file) = self.layers[index]
                .files
                .iter_mut()
                .find(|file| file.relative == write.relative)
            {
                file.digest = hex::encode(blake3::hash(write.text.as_bytes()).as_bytes());
                file.text = write.text.clone();
            }
            applied += 1;
        }
        info!(layer, files = applied, "write-back applied");
        Ok(writes)
    }

    fn index_of(&self, layer: &str) -> Result<usize, SessionError> {
        self.layers
            .iter()
            .position(|loaded| loaded.definition.name == layer)
            .ok_or_else(|| SessionError::UnknownLayer(layer.to_string()))
    }
}

/// Walk `from` upward until a node with a recorded origin file is found.
fn nearest_origin(merge: &LayerMergeResult, from: NodeId) -> Option<String> {
    let mut probe = Some(from);
    while let Some(node) = probe {
        if let Some(file) = merge.origins.get(&merge.merged.path(node)) {
            return Some(file.clone());
        }
        probe = merge.merged.parent(node);
    }
    None
}
