//! The canonical cascade rule.
//!
//! One rule, used verbatim by the runtime resolve path and the editor's
//! preview path: walking target against source, objects meeting objects
//! recurse; everything else is wholesale replacement. Arrays and scalars are
//! never concatenated or element-merged, and a scalar may flatten an entire
//! object subtree (and vice versa). Inputs are never mutated; the result is
//! a fresh tree, so the same inputs always produce the same output.

use tracing::{debug, instrument};

use crate::cascade::provenance::{Provenance, ValueOrigin};
use crate::dom::{DomTree, NodeId};

/// Output of one cascade pass, before reference resolution.
#[derive(Debug)]
pub struct CascadeResult {
    pub merged: DomTree,
    pub provenance: Provenance,
}

impl CascadeResult {
    pub fn value_origin(&self, path: &str) -> Option<ValueOrigin> {
        self.provenance.value_origins.get(path).copied()
    }

    pub fn override_sources(&self, path: &str) -> &[ValueOrigin] {
        self.provenance
            .override_sources
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Merge the defaults tree (if any) and every layer tree, lowest priority
/// first, into one tree with provenance.
#[instrument(skip_all, fields(layers = layers.len(), defaults = defaults.is_some()))]
pub fn cascade(defaults: Option<&DomTree>, layers: &[&DomTree]) -> CascadeResult {
    let mut merged = DomTree::new_object();
    let mut provenance = Provenance::default();

    if let Some(tree) = defaults {
        merge_tree(&mut merged, tree, ValueOrigin::Defaults, &mut provenance);
    }
    for (index, tree) in layers.iter().enumerate() {
        merge_tree(&mut merged, tree, ValueOrigin::Layer(index), &mut provenance);
    }

    debug!(
        nodes = merged.node_count(merged.root()),
        tracked = provenance.value_origins.len(),
        "cascade merged"
    );
    CascadeResult { merged, provenance }
}

fn merge_tree(
    target: &mut DomTree,
    source: &DomTree,
    origin: ValueOrigin,
    provenance: &mut Provenance,
) {
    let into = target.root();
    let from = source.root();
    if target.kind(into).is_object() && source.kind(from).is_object() {
        merge_node(target, into, source, from, origin, provenance);
    } else {
        let path = target.path(into);
        provenance.forget_subtree(&path);
        target.replace_subtree(into, &source.extract(from));
        provenance.touch_subtree(target, into, origin);
    }
}

fn merge_node(
    target: &mut DomTree,
    into: NodeId,
    source: &DomTree,
    from: NodeId,
    origin: ValueOrigin,
    provenance: &mut Provenance,
) {
    provenance.touch(&target.path(into), origin);
    for child in source.children(from) {
        let name = source.name(*child);
        match target.child_by_name(into, name) {
            Some(existing)
                if target.kind(existing).is_object() && source.kind(*child).is_object() =>
            {
                merge_node(target, existing, source, *child, origin, provenance);
            }
            Some(existing) => {
                let path = target.path(existing);
                provenance.forget_subtree(&path);
                target.replace_subtree(existing, &source.extract(*child));
                provenance.touch_subtree(target, existing, origin);
            }
            None => {
                let inserted = target
                    .insert_child(into, name, &source.extract(*child))
                    .expect("child verified absent");
                provenance.touch_subtree(target, inserted, origin);
            }
        }
    }
}
