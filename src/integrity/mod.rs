//! Cross-layer advisory checks, run over raw per-layer source data and
//! independent of the main pipeline.
//!
//! Everything here is a warning: the pipeline stays usable, the report just
//! names drift the user probably wants to repair. Four checks:
//! true overlap (same-layer, re-derived from raw files), file placement
//! drift, property-name casing drift, and filesystem-vs-schema casing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::dom::{path, Fragment};
use crate::layer::LoadedLayer;
use crate::schema::SchemaNode;
use crate::settings::IntegritySettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind")]
pub enum IntegrityWarning {
    /// Two or more files in one layer define the same non-mergeable path.
    #[error("{layer}: {path} defined by {}", files.join(", "))]
    TrueOverlap {
        layer: String,
        path: String,
        files: Vec<String>,
    },
    /// A top-level section lives at structurally different file paths in
    /// different places (file form vs directory form).
    #[error("{path} placed inconsistently: {}", locations.join("; "))]
    Placement {
        path: String,
        locations: Vec<String>,
    },
    /// One case-insensitive path is spelled with different casings.
    #[error("{path} spelled {} at {}", spellings.join(" / "), locations.join("; "))]
    Casing {
        path: String,
        spellings: Vec<String>,
        locations: Vec<String>,
    },
    /// A mount segment's file-system casing disagrees with the schema's
    /// canonical casing for that path.
    #[error("{layer}:{file}: segment {found:?} should be {canonical:?}")]
    SchemaCasing {
        layer: String,
        file: String,
        path: String,
        found: String,
        canonical: String,
    },
}

#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub warnings: Vec<IntegrityWarning>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Where a record came from, rendered `layer:file` in reports.
fn location(layer: &str, file: &str) -> String {
    format!("{}:{}", layer, file)
}

/// One file's contribution at one path.
struct Definition {
    file: String,
    is_object: bool,
}

#[derive(Default)]
struct Records {
    /// Per layer: folded path → (first exact path, definitions in file order).
    definitions: BTreeMap<String, BTreeMap<String, (String, Vec<Definition>)>>,
    /// Folded path → exact final segment → locations using that spelling.
    casings: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Folded top segment → folded placement form → (exact form, locations).
    placements: BTreeMap<String, BTreeMap<String, (String, Vec<String>)>>,
}

impl Records {
    fn define(&mut self, layer: &str, folded: &str, exact: &str, file: &str, is_object: bool) {
        let (_, definitions) = self
            .definitions
            .entry(layer.to_string())
            .or_default()
            .entry(folded.to_string())
            .or_insert_with(|| (exact.to_string(), Vec::new()));
        definitions.push(Definition {
            file: file.to_string(),
            is_object,
        });
    }

    fn spell(&mut self, folded: &str, segment: &str, layer: &str, file: &str) {
        self.casings
            .entry(folded.to_string())
            .or_default()
            .entry(segment.to_string())
            .or_default()
            .push(location(layer, file));
    }

    fn place(&mut self, top: &str, form: &str, layer: &str, file: &str) {
        let folded_form = path::fold_key(form);
        let entry = self
            .placements
            .entry(path::fold_key(top))
            .or_default()
            .entry(folded_form)
            .or_insert_with(|| (form.to_string(), Vec::new()));
        entry.1.push(location(layer, file));
    }
}

/// Run the advisory checks. `settings` can switch the casing and placement
/// families off; true overlap always runs.
#[instrument(skip_all, fields(layers = layers.len(), schema = schema.is_some()))]
pub fn check_integrity(
    layers: &[LoadedLayer],
    schema: Option<&SchemaNode>,
    settings: &IntegritySettings,
) -> IntegrityReport {
    let mut records = Records::default();
    let mut warnings = Vec::new();

    for layer in layers {
        for file in &layer.files {
            if !file.root.is_object() {
                continue; // skipped by the merge; contributes nothing
            }
            collect_file(&mut records, layer, file);
            if settings.casing {
                if let Some(schema) = schema {
                    check_schema_casing(&mut warnings, layer, file, schema);
                }
            }
        }
    }

    collect_overlaps(&records, &mut warnings);
    if settings.placement {
        collect_placement_drift(&records, &mut warnings);
    }
    if settings.casing {
        collect_casing_drift(&records, &mut warnings);
    }

    debug!(warnings = warnings.len(), "integrity checks finished");
    IntegrityReport { warnings }
}

fn collect_file(records: &mut Records, layer: &LoadedLayer, file: &crate::layer::SourceFile) {
    let layer_name = &layer.definition.name;
    let mount = file.mount_segments();

    if let Some(first) = file.relative.split('/').next() {
        records.place(&mount[0], first, layer_name, &file.relative);
    }

    // Mount chain segments come from the file system and are Objects.
    let mut folded_segments: Vec<String> = Vec::with_capacity(mount.len());
    for segment in &mount {
        folded_segments.push(path::fold_key(segment));
        let folded = path::from_segments(folded_segments.iter().map(String::as_str));
        records.define(layer_name, &folded, segment, &file.relative, true);
        records.spell(&folded, segment, layer_name, &file.relative);
    }

    if let Fragment::Object(entries) = &file.root {
        collect_entries(records, layer_name, &file.relative, &mut folded_segments, entries);
    }
}

fn collect_entries(
    records: &mut Records,
    layer: &str,
    file: &str,
    folded_segments: &mut Vec<String>,
    entries: &[(String, Fragment)],
) {
    for (key, fragment) in entries {
        folded_segments.push(path::fold_key(key));
        let folded = path::from_segments(folded_segments.iter().map(String::as_str));
        records.define(layer, &folded, key, file, fragment.is_object());
        records.spell(&folded, key, layer, file);
        if let Fragment::Object(children) = fragment {
            collect_entries(records, layer, file, folded_segments, children);
        }
        folded_segments.pop();
    }
}

/// Same rule as the intra-layer merge, re-derived from raw definitions: two
/// or more files on one path where any side is not an Object.
fn collect_overlaps(records: &Records, warnings: &mut Vec<IntegrityWarning>) {
    for (layer, paths) in &records.definitions {
        for (_, (exact, definitions)) in paths {
            if definitions.len() < 2 {
                continue;
            }
            if definitions.iter().all(|definition| definition.is_object) {
                continue;
            }
            let mut files: Vec<String> = Vec::new();
            for definition in definitions {
                if !files.contains(&definition.file) {
                    files.push(definition.file.clone());
                }
            }
            if files.len() < 2 {
                continue;
            }
            warnings.push(IntegrityWarning::TrueOverlap {
                layer: layer.clone(),
                path: exact.clone(),
                files,
            });
        }
    }
}

fn collect_placement_drift(records: &Records, warnings: &mut Vec<IntegrityWarning>) {
    for (top, forms) in &records.placements {
        if forms.len() < 2 {
            continue;
        }
        let mut locations = Vec::new();
        for (_, (exact_form, sites)) in forms {
            for site in sites {
                locations.push(format!("{} as {}", site, exact_form));
            }
        }
        warnings.push(IntegrityWarning::Placement {
            path: path::from_segments([top.as_str()]),
            locations,
        });
    }
}

fn collect_casing_drift(records: &Records, warnings: &mut Vec<IntegrityWarning>) {
    for (folded, spellings) in &records.casings {
        if spellings.len() < 2 {
            continue;
        }
        let mut distinct = Vec::new();
        let mut locations = Vec::new();
        for (spelling, sites) in spellings {
            distinct.push(spelling.clone());
            for site in sites {
                locations.push(format!("{} as {}", site, spelling));
            }
        }
        warnings.push(IntegrityWarning::Casing {
            path: folded.clone(),
            spellings: distinct,
            locations,
        });
    }
}

/// Mount segments must match the canonical casing the schema declares.
fn check_schema_casing(
    warnings: &mut Vec<IntegrityWarning>,
    layer: &LoadedLayer,
    file: &crate::layer::SourceFile,
    schema: &SchemaNode,
) {
    let mut current = schema;
    let mut walked: Vec<&str> = Vec::new();
    for segment in file.mount_segments() {
        let Some((canonical, child)) = current.property(&segment) else {
            return; // schema does not reach this deep; nothing to compare
        };
        walked.push(canonical);
        if canonical != segment {
            warnings.push(IntegrityWarning::SchemaCasing {
                layer: layer.definition.name.clone(),
                file: file.relative.clone(),
                path: path::from_segments(walked.iter().copied()),
                found: segment.clone(),
                canonical: canonical.to_string(),
            });
        }
        current = child;
    }
}
