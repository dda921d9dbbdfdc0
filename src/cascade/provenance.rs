//! Provenance bookkeeping for the cascade.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::dom::{DomTree, NodeId};

/// Which pseudo-layer or data layer supplied a value. The defaults layer
/// sorts below every data layer, matching merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    /// The synthetic schema-defaults base layer.
    Defaults,
    /// A data layer, by its position in the ordered layer list.
    Layer(usize),
}

impl ValueOrigin {
    pub fn layer_index(&self) -> Option<usize> {
        match self {
            ValueOrigin::Defaults => None,
            ValueOrigin::Layer(index) => Some(*index),
        }
    }
}

impl fmt::Display for ValueOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOrigin::Defaults => write!(f, "defaults"),
            ValueOrigin::Layer(index) => write!(f, "layer {}", index),
        }
    }
}

/// The two provenance maps the cascade maintains.
///
/// `value_origins` answers "who won here" and holds only paths that exist in
/// the merged tree; entries under a subtree that a later layer wholly
/// replaced are dropped along with the subtree. `override_sources` answers
/// "who ever contributed here" and keeps the full history, including paths
/// that were later replaced away.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub value_origins: BTreeMap<String, ValueOrigin>,
    pub override_sources: BTreeMap<String, Vec<ValueOrigin>>,
}

impl Provenance {
    pub fn touch(&mut self, path: &str, origin: ValueOrigin) {
        self.value_origins.insert(path.to_string(), origin);
        let sources = self.override_sources.entry(path.to_string()).or_default();
        if !sources.contains(&origin) {
            sources.push(origin);
        }
    }

    /// Record `origin` for every node in the subtree at `from`.
    pub fn touch_subtree(&mut self, tree: &DomTree, from: NodeId, origin: ValueOrigin) {
        for id in tree.descendants(from) {
            self.touch(&tree.path(id), origin);
        }
    }

    /// Drop `value_origins` entries for `path` and everything below it.
    /// Called before a replacement lands, so the winning map never names
    /// paths the replacement erased.
    pub fn forget_subtree(&mut self, path: &str) {
        let prefix = format!("{}/", path);
        self.value_origins
            .retain(|recorded, _| recorded != path && !recorded.starts_with(&prefix));
    }
}
