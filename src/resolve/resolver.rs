//! Fixed-point reference resolution.
//!
//! Each pass replaces every `Ref` whose target subtree is itself already
//! reference-free with a deep clone of that target, looked up in the tree as
//! it stands, so forward and backward references both work and chains
//! resolve innermost-first. When a pass makes no progress the leftovers are
//! classified by walking their target chains: a missing target, an external
//! target, a cycle back into the chain, or a target blocked by unresolvable
//! references inside it. Leftover `Ref` nodes stay in the tree (they render
//! back to their wire form), and resolution never aborts over them.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::dom::{DomTree, NodeId, NodeKind};
use crate::resolve::refs::is_external;

/// One unresolved reference, reported at the path of the `Ref` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind")]
pub enum ResolveIssue {
    #[error("{path}: reference target {target} not found")]
    Missing { path: String, target: String },
    #[error("{path}: external reference {target} left unresolved")]
    External { path: String, target: String },
    #[error("{path}: reference cycle through {target}")]
    Cycle { path: String, target: String },
    #[error("{path}: reference target {target} contains unresolved references")]
    Blocked { path: String, target: String },
}

#[derive(Debug)]
pub struct ResolveResult {
    pub tree: DomTree,
    pub issues: Vec<ResolveIssue>,
    /// References successfully replaced.
    pub replaced: usize,
}

/// Resolve every reference in a clone of `input`. The input tree is left
/// untouched so callers can keep the pre-resolution tree for introspection.
#[instrument(skip_all)]
pub fn resolve_refs(input: &DomTree) -> ResolveResult {
    let mut tree = input.clone_compacted();
    let mut issues = Vec::new();

    // Refs are leaves, so ids collected here are never buried by another
    // ref's replacement; the pending set only ever shrinks.
    let mut pending: Vec<NodeId> = tree
        .descendants(tree.root())
        .filter(|id| tree.kind(*id).is_ref())
        .collect();

    pending.retain(|id| {
        if let NodeKind::Ref { target } = tree.kind(*id) {
            if is_external(target) {
                issues.push(ResolveIssue::External {
                    path: tree.path(*id),
                    target: target.clone(),
                });
                return false;
            }
        }
        true
    });

    let mut replaced = 0;
    loop {
        let mut progressed = false;
        let mut still = Vec::with_capacity(pending.len());
        for id in pending {
            let target = match tree.kind(id) {
                NodeKind::Ref { target } => target.clone(),
                _ => continue,
            };
            match tree.lookup(&target) {
                Some(found) if !tree.contains_ref(found) => {
                    let fragment = tree.extract(found);
                    tree.replace_subtree(id, &fragment);
                    replaced += 1;
                    progressed = true;
                }
                _ => still.push(id),
            }
        }
        pending = still;
        if pending.is_empty() || !progressed {
            break;
        }
    }

    for id in &pending {
        issues.push(classify_leftover(&tree, *id));
    }

    debug!(
        replaced,
        unresolved = issues.len(),
        "reference resolution finished"
    );
    ResolveResult {
        tree,
        issues,
        replaced,
    }
}

/// Walk the target chain of a leftover reference with a visited-path set.
fn classify_leftover(tree: &DomTree, id: NodeId) -> ResolveIssue {
    let path = tree.path(id);
    let target = match tree.kind(id) {
        NodeKind::Ref { target } => target.clone(),
        _ => unreachable!("leftovers are Ref nodes"),
    };

    let mut visited = vec![path.clone()];
    let mut current_target = target.clone();
    let mut first_hop = true;
    loop {
        let found = match tree.lookup(&current_target) {
            Some(found) => found,
            // A dead end on the first hop means this ref's own target is
            // gone; deeper in the chain the ref is merely blocked.
            None if first_hop => return ResolveIssue::Missing { path, target },
            None => return ResolveIssue::Blocked { path, target },
        };
        first_hop = false;
        let found_path = tree.path(found);
        if visited.contains(&found_path) {
            return ResolveIssue::Cycle { path, target };
        }
        match tree.kind(found) {
            NodeKind::Ref { target: next } => {
                if is_external(next) {
                    return ResolveIssue::Blocked { path, target };
                }
                visited.push(found_path);
                current_target = next.clone();
            }
            _ => {
                // A container target: cyclic if it encloses any ref already
                // on the chain, otherwise blocked by whatever is inside it.
                let enclosure = format!("{}/", found_path);
                if visited
                    .iter()
                    .any(|seen| *seen == found_path || seen.starts_with(&enclosure))
                {
                    return ResolveIssue::Cycle { path, target };
                }
                return ResolveIssue::Blocked { path, target };
            }
        }
    }
}
