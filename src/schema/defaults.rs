//! Schema-defaults pseudo-layer synthesis.
//!
//! The cascade's base layer is built straight from the schema: every node
//! carrying a `default` contributes it, with just the Object chains needed
//! to host them. An explicit default on an Object wins over its properties'
//! individual defaults; it is taken wholesale, unrecursed.

use tracing::{debug, instrument};

use crate::dom::{DomTree, Fragment};
use crate::schema::node::SchemaNode;

/// Materialize the defaults tree. Empty (a bare `$root` object) when the
/// schema declares no defaults at all.
#[instrument(skip_all)]
pub fn schema_defaults(schema: &SchemaNode) -> DomTree {
    let tree = match build_default(schema) {
        Some(fragment) => DomTree::from_fragment(&fragment),
        None => DomTree::new_object(),
    };
    debug!(nodes = tree.node_count(tree.root()), "defaults synthesized");
    tree
}

fn build_default(schema: &SchemaNode) -> Option<Fragment> {
    if let Some(value) = &schema.default {
        let (fragment, _) = Fragment::from_json(value);
        return Some(fragment);
    }
    let entries: Vec<(String, Fragment)> = schema
        .properties
        .iter()
        .filter_map(|(key, child)| build_default(child).map(|fragment| (key.clone(), fragment)))
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(Fragment::Object(entries))
    }
}
