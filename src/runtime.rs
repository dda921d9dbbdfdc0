//! Runtime consumer: typed read access to a resolved tree.
//!
//! `ResolvedConfig` is what most applications want from the engine. It drops
//! provenance and holds only the final, reference-free tree, with accessors
//! that return `None` rather than erroring when a path is absent or a value
//! has another kind.

use crate::dom::{DomTree, NodeKind, Scalar};
use crate::engine::RefreshResult;

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    tree: DomTree,
}

impl ResolvedConfig {
    pub fn new(tree: DomTree) -> Self {
        ResolvedConfig { tree }
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// The scalar at `path`, if the path exists and holds a Value node.
    pub fn scalar(&self, path: &str) -> Option<&Scalar> {
        let id = self.tree.lookup(path)?;
        match self.tree.kind(id) {
            NodeKind::Value(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.scalar(path)?.as_str()
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.scalar(path)?.as_i64()
    }

    /// Integral numbers widen, so a stored `3` reads back as `3.0`.
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.scalar(path)?.as_f64()
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.scalar(path)?.as_bool()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.tree.to_json(self.tree.root())
    }
}

impl From<RefreshResult> for ResolvedConfig {
    fn from(result: RefreshResult) -> Self {
        ResolvedConfig::new(result.resolved)
    }
}
