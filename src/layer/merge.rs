//! Intra-layer merge: fold a layer's files into one tree.
//!
//! Files are processed in the sorted order the loader produced. Each file is
//! mounted at its relative path with the extension stripped; from there its
//! root object merges key by key. Object meets object: recurse. Anything
//! else meeting an existing key is a same-layer conflict: the first writer
//! stays, both files are named in the issue. The merger never fails; every
//! problem lands in the result's issue list.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::dom::{path, DomTree, Fragment, NodeId};
use crate::layer::{LayerIssue, LayerMergeResult, LoadedLayer, SourceFile};

#[instrument(skip_all, fields(layer = %layer.definition.name, files = layer.files.len()))]
pub fn merge_layer(layer: &LoadedLayer) -> LayerMergeResult {
    let mut merged = DomTree::new_object();
    let mut origins: BTreeMap<String, String> = BTreeMap::new();
    let mut issues = layer.issues.clone();

    for file in &layer.files {
        if !file.root.is_object() {
            issues.push(LayerIssue::Structural {
                file: file.relative.clone(),
                kind: file.root.kind_name().to_string(),
            });
            continue;
        }
        let mount = file.mount_segments();
        for dropped in &file.duplicate_keys {
            issues.push(LayerIssue::DuplicateKey {
                file: file.relative.clone(),
                path: path::from_segments(
                    mount
                        .iter()
                        .map(String::as_str)
                        .chain(dropped.split(path::SEPARATOR)),
                ),
            });
        }
        merge_file(&mut merged, &mut origins, &mut issues, file, &mount);
    }

    debug!(
        nodes = merged.node_count(merged.root()),
        issues = issues.len(),
        "layer merged"
    );
    LayerMergeResult {
        layer: layer.definition.name.clone(),
        merged,
        origins,
        issues,
    }
}

/// Walk (or create) the mount chain, then merge the file's root object into
/// the mount node. A non-object already sitting on the mount chain means the
/// file has nowhere to land; it is skipped with an overlap issue.
fn merge_file(
    tree: &mut DomTree,
    origins: &mut BTreeMap<String, String>,
    issues: &mut Vec<LayerIssue>,
    file: &SourceFile,
    mount: &[String],
) {
    let mut node = tree.root();
    for segment in mount {
        node = match tree.child_by_name(node, segment) {
            None => {
                let created = tree
                    .insert_child(node, segment, &Fragment::Object(Vec::new()))
                    .expect("mount segment verified absent");
                origins.insert(tree.path(created), file.relative.clone());
                created
            }
            Some(existing) if tree.kind(existing).is_object() => existing,
            Some(existing) => {
                let conflict = tree.path(existing);
                let first = first_writer(origins, &conflict);
                issues.push(LayerIssue::Overlap {
                    path: conflict,
                    first,
                    second: file.relative.clone(),
                });
                return;
            }
        };
    }
    if let Fragment::Object(entries) = &file.root {
        merge_object(tree, node, entries, origins, issues, &file.relative);
    }
}

fn merge_object(
    tree: &mut DomTree,
    target: NodeId,
    entries: &[(String, Fragment)],
    origins: &mut BTreeMap<String, String>,
    issues: &mut Vec<LayerIssue>,
    file: &str,
) {
    for (name, fragment) in entries {
        match tree.child_by_name(target, name) {
            None => {
                let inserted = tree
                    .insert_child(target, name, fragment)
                    .expect("object child verified absent");
                record_origins(tree, inserted, origins, file);
            }
            Some(existing) => match (tree.kind(existing).is_object(), fragment) {
                (true, Fragment::Object(children)) => {
                    merge_object(tree, existing, children, origins, issues, file);
                }
                _ => {
                    let conflict = tree.path(existing);
                    let first = first_writer(origins, &conflict);
                    issues.push(LayerIssue::Overlap {
                        path: conflict,
                        first,
                        second: file.to_string(),
                    });
                }
            },
        }
    }
}

/// Every node below the root was recorded when it was merged in.
fn first_writer(origins: &BTreeMap<String, String>, conflict: &str) -> String {
    origins
        .get(conflict)
        .cloned()
        .expect("merged node has a recorded origin")
}

fn record_origins(
    tree: &DomTree,
    from: NodeId,
    origins: &mut BTreeMap<String, String>,
    file: &str,
) {
    for id in tree.descendants(from) {
        origins.insert(tree.path(id), file.to_string());
    }
}
