//! Project manifest loading.
//!
//! A project is a directory with a `strata.json` manifest declaring the
//! ordered layer list and, optionally, glob patterns for schema source
//! files. The manifest is static input; everything else the engine needs is
//! derived from the layer folders it names.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::dom::path;
use crate::error::LoadError;
use crate::layer::LayerDefinition;
use crate::schema::SchemaNode;

/// Manifest file name looked up at the project root.
pub const MANIFEST_FILE_NAME: &str = "strata.json";

/// Parsed `strata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Layers in ascending priority order (later entries override earlier).
    pub layers: Vec<LayerDefinition>,
    /// Glob patterns (relative to the project root) selecting schema files.
    #[serde(default)]
    pub schema: Vec<String>,
}

/// A manifest bound to the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct Project {
    /// Project root directory, canonicalized when possible.
    pub root: PathBuf,
    pub manifest: ProjectManifest,
}

impl Project {
    /// Load `strata.json` from `dir`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let root = dunce::canonicalize(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let manifest_path = root.join(MANIFEST_FILE_NAME);
        let text = fs::read_to_string(&manifest_path).map_err(|source| LoadError::Manifest {
            path: manifest_path.clone(),
            detail: source.to_string(),
        })?;
        let manifest: ProjectManifest =
            serde_json::from_str(&text).map_err(|source| LoadError::Manifest {
                path: manifest_path.clone(),
                detail: source.to_string(),
            })?;
        if manifest.layers.is_empty() {
            return Err(LoadError::Manifest {
                path: manifest_path,
                detail: "manifest declares no layers".to_string(),
            });
        }
        debug!(
            layers = manifest.layers.len(),
            schema_globs = manifest.schema.len(),
            "manifest loaded"
        );
        Ok(Self { root, manifest })
    }

    /// Layer definitions with folders resolved against the project root.
    pub fn layer_definitions(&self) -> Vec<LayerDefinition> {
        self.manifest
            .layers
            .iter()
            .map(|layer| LayerDefinition {
                name: layer.name.clone(),
                folder: self.root.join(&layer.folder),
            })
            .collect()
    }

    /// Load and merge the schema files selected by the manifest globs.
    ///
    /// Matched files are sorted lexicographically by relative path and their
    /// top-level properties merged first-wins; a property redefined by a
    /// later file is kept from the earlier one and logged. Returns `None`
    /// when the manifest declares no schema globs or nothing matches.
    #[instrument(skip_all, fields(globs = self.manifest.schema.len()))]
    pub fn load_schema(&self) -> Result<Option<SchemaNode>, LoadError> {
        if self.manifest.schema.is_empty() {
            return Ok(None);
        }
        let globs = build_globs(&self.manifest.schema).map_err(|detail| LoadError::Manifest {
            path: self.root.join(MANIFEST_FILE_NAME),
            detail,
        })?;

        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|source| LoadError::Manifest {
                path: self.root.clone(),
                detail: source.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if globs.is_match(&relative) {
                matches.push((relative, entry.path().to_path_buf()));
            }
        }
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        let mut merged: Option<SchemaNode> = None;
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for (relative, absolute) in &matches {
            let text = fs::read_to_string(absolute).map_err(|source| LoadError::Manifest {
                path: absolute.clone(),
                detail: source.to_string(),
            })?;
            let root: SchemaNode =
                serde_json::from_str(&text).map_err(|source| LoadError::Manifest {
                    path: absolute.clone(),
                    detail: source.to_string(),
                })?;
            match merged.as_mut() {
                None => {
                    seen.extend(root.properties.keys().map(|key| path::fold_key(key)));
                    merged = Some(root);
                }
                Some(schema) => {
                    for (name, node) in root.properties {
                        let folded = path::fold_key(&name);
                        if seen.contains(&folded) {
                            warn!(file = %relative, property = %name, "schema property already defined; keeping the first");
                            continue;
                        }
                        seen.insert(folded);
                        schema.properties.insert(name, node);
                    }
                }
            }
        }
        debug!(files = matches.len(), "schema sources merged");
        Ok(merged)
    }
}

fn build_globs(patterns: &[String]) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| format!("bad schema glob {pattern:?}: {err}"))?;
        builder.add(glob);
    }
    builder.build().map_err(|err| err.to_string())
}
