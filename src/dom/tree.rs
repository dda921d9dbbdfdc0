//! Arena-backed configuration DOM.
//!
//! A [`DomTree`] owns every node in a flat slot vector; [`NodeId`]s index into
//! it and parent links are plain ids, so ownership flows strictly from
//! container to child with no reference cycles. Paths and depths are derived
//! at attach time and on demand: an array item's path segment is its
//! *current* position, so insert/remove renumbers every following sibling
//! without any rename step.

use crate::dom::node::{NodeId, NodeKind, Scalar};
use crate::dom::path;
use crate::error::DomError;

/// A detached subtree, independent of any arena.
///
/// Fragments are the currency for moving structure between trees: extract
/// from one tree, implant into another (or back into the same tree, which is
/// how reference resolution clones a target over a `$ref` node). Object
/// entries inside a fragment are expected to be case-insensitive-unique;
/// [`Fragment::from_json`] enforces that by dropping later duplicates and
/// reporting them.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Object(Vec<(String, Fragment)>),
    Array(Vec<Fragment>),
    Value(Scalar),
    Ref(String),
}

impl Fragment {
    /// Convert parsed JSON into a fragment.
    ///
    /// An object literal of exactly `{"$ref": "<path>"}` becomes a
    /// [`Fragment::Ref`]. Object keys that collide case-insensitively keep
    /// the first writer; the dropped keys are returned as `/`-joined paths
    /// relative to `value`.
    pub fn from_json(value: &serde_json::Value) -> (Fragment, Vec<String>) {
        let mut dropped = Vec::new();
        let mut trail = Vec::new();
        let fragment = Self::convert(value, &mut trail, &mut dropped);
        (fragment, dropped)
    }

    fn convert(
        value: &serde_json::Value,
        trail: &mut Vec<String>,
        dropped: &mut Vec<String>,
    ) -> Fragment {
        match value {
            serde_json::Value::Object(map) => {
                if let Some(target) = ref_target(map) {
                    return Fragment::Ref(target.to_string());
                }
                let mut entries: Vec<(String, Fragment)> = Vec::with_capacity(map.len());
                let mut seen: Vec<String> = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let folded = path::fold_key(key);
                    if seen.contains(&folded) {
                        trail.push(key.clone());
                        dropped.push(trail.join("/"));
                        trail.pop();
                        continue;
                    }
                    seen.push(folded);
                    trail.push(key.clone());
                    let fragment = Self::convert(child, trail, dropped);
                    trail.pop();
                    entries.push((key.clone(), fragment));
                }
                Fragment::Object(entries)
            }
            serde_json::Value::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for (index, child) in values.iter().enumerate() {
                    trail.push(index.to_string());
                    items.push(Self::convert(child, trail, dropped));
                    trail.pop();
                }
                Fragment::Array(items)
            }
            scalar => Fragment::Value(Scalar::from_json(scalar).unwrap_or(Scalar::Null)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Fragment::Object(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, child) in entries {
                    map.insert(key.clone(), child.to_json());
                }
                serde_json::Value::Object(map)
            }
            Fragment::Array(items) => {
                serde_json::Value::Array(items.iter().map(Fragment::to_json).collect())
            }
            Fragment::Value(scalar) => scalar.to_json(),
            Fragment::Ref(target) => {
                let mut map = serde_json::Map::with_capacity(1);
                map.insert(
                    "$ref".to_string(),
                    serde_json::Value::String(target.clone()),
                );
                serde_json::Value::Object(map)
            }
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Fragment::Object(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Fragment::Object(_) => "object",
            Fragment::Array(_) => "array",
            Fragment::Value(scalar) => scalar.kind_name(),
            Fragment::Ref(_) => "reference",
        }
    }
}

/// Recognize the `{"$ref": "<path>"}` wire form.
fn ref_target(map: &serde_json::Map<String, serde_json::Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    match map.get("$ref") {
        Some(serde_json::Value::String(target)) => Some(target),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    /// Case-folded name, cached for object-key comparisons.
    folded: String,
    parent: Option<NodeId>,
    depth: u32,
    kind: NodeKind,
}

/// The tree arena. See the module docs for the ownership model.
///
/// Detached slots left behind by remove/replace operations stay in the arena
/// unreachable; they are reclaimed when the tree is cloned or extracted.
#[derive(Debug, Clone)]
pub struct DomTree {
    slots: Vec<Slot>,
    root: NodeId,
}

const NO_CHILDREN: &[NodeId] = &[];

impl DomTree {
    /// A tree whose root is an empty object named `$root`.
    pub fn new_object() -> Self {
        let root_slot = Slot {
            name: path::ROOT.to_string(),
            folded: path::ROOT.to_string(),
            parent: None,
            depth: 0,
            kind: NodeKind::Object {
                children: Vec::new(),
            },
        };
        DomTree {
            slots: vec![root_slot],
            root: NodeId(0),
        }
    }

    /// Build a tree whose root carries `fragment` (any kind, not only Object).
    pub fn from_fragment(fragment: &Fragment) -> Self {
        let mut tree = DomTree::new_object();
        tree.replace_subtree(tree.root, fragment);
        tree
    }

    /// Parse JSON into a tree; returns dropped case-duplicate key paths (see
    /// [`Fragment::from_json`]).
    pub fn from_json(value: &serde_json::Value) -> (Self, Vec<String>) {
        let (fragment, dropped) = Fragment::from_json(value);
        (Self::from_fragment(&fragment), dropped)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slot(id).kind
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.slot(id).name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.slot(id).depth
    }

    /// Canonical path of a node: `$root/seg/.../seg`. Array item segments are
    /// computed from the item's current position.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments: Vec<String> = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            match self.kind(parent) {
                NodeKind::Array { items } => {
                    let position = items
                        .iter()
                        .position(|item| *item == current)
                        .expect("item listed in its parent");
                    segments.push(position.to_string());
                }
                _ => segments.push(self.name(current).to_string()),
            }
            current = parent;
        }
        segments.reverse();
        path::from_segments(segments.iter().map(String::as_str))
    }

    /// Object children in insertion order; empty for non-objects.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Object { children } => children,
            _ => NO_CHILDREN,
        }
    }

    /// Array items in order; empty for non-arrays.
    pub fn items(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Array { items } => items,
            _ => NO_CHILDREN,
        }
    }

    /// Case-insensitive child lookup on an object.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let folded = path::fold_key(name);
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.slot(*child).folded == folded)
    }

    pub fn item(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.items(id).get(index).copied()
    }

    /// Resolve a path expression (`$root/a/b/0`, `/a/b/0`, or `a/b/0`) to a
    /// node. Object segments match case-insensitively; array segments must
    /// parse as indices.
    pub fn lookup(&self, expr: &str) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path::segments(expr) {
            current = match self.kind(current) {
                NodeKind::Object { .. } => self.child_by_name(current, segment)?,
                NodeKind::Array { .. } => {
                    let index: usize = segment.parse().ok()?;
                    self.item(current, index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    fn alloc(&mut self, name: String, parent: Option<NodeId>, depth: u32, kind: NodeKind) -> NodeId {
        let folded = path::fold_key(&name);
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            name,
            folded,
            parent,
            depth,
            kind,
        });
        id
    }

    /// Recursively materialize a fragment as a new node under `parent`.
    fn build(&mut self, name: &str, fragment: &Fragment, parent: NodeId) -> NodeId {
        let depth = self.depth(parent) + 1;
        match fragment {
            Fragment::Object(entries) => {
                let id = self.alloc(
                    name.to_string(),
                    Some(parent),
                    depth,
                    NodeKind::Object {
                        children: Vec::new(),
                    },
                );
                let children: Vec<NodeId> = entries
                    .iter()
                    .map(|(child_name, child)| self.build(child_name, child, id))
                    .collect();
                match &mut self.slots[id.index()].kind {
                    NodeKind::Object { children: slot } => *slot = children,
                    _ => unreachable!(),
                }
                id
            }
            Fragment::Array(fragments) => {
                let id = self.alloc(
                    name.to_string(),
                    Some(parent),
                    depth,
                    NodeKind::Array { items: Vec::new() },
                );
                let items: Vec<NodeId> = fragments
                    .iter()
                    .map(|item| self.build("", item, id))
                    .collect();
                match &mut self.slots[id.index()].kind {
                    NodeKind::Array { items: slot } => *slot = items,
                    _ => unreachable!(),
                }
                id
            }
            Fragment::Value(scalar) => self.alloc(
                name.to_string(),
                Some(parent),
                depth,
                NodeKind::Value(scalar.clone()),
            ),
            Fragment::Ref(target) => self.alloc(
                name.to_string(),
                Some(parent),
                depth,
                NodeKind::Ref {
                    target: target.clone(),
                },
            ),
        }
    }

    /// Add a child to an object. Rejects a name already present
    /// (case-insensitively); callers must remove or replace explicitly.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: &str,
        fragment: &Fragment,
    ) -> Result<NodeId, DomError> {
        let folded = path::fold_key(name);
        match self.kind(parent) {
            NodeKind::Object { children } => {
                if children
                    .iter()
                    .any(|child| self.slot(*child).folded == folded)
                {
                    return Err(DomError::DuplicateKey(name.to_string()));
                }
            }
            _ => return Err(DomError::NotAnObject),
        }
        let id = self.build(name, fragment, parent);
        match &mut self.slots[parent.index()].kind {
            NodeKind::Object { children } => children.push(id),
            _ => unreachable!(),
        }
        Ok(id)
    }

    /// Detach a child by case-insensitive name; returns the detached id.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let removed = self.child_by_name(parent, name)?;
        if let NodeKind::Object { children } = &mut self.slots[parent.index()].kind {
            children.retain(|child| *child != removed);
        }
        self.slots[removed.index()].parent = None;
        Some(removed)
    }

    /// Replace an existing child in place, keeping its position. The new node
    /// takes the replacement `fragment` but keeps the existing child's name.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        name: &str,
        fragment: &Fragment,
    ) -> Result<NodeId, DomError> {
        let existing = self
            .child_by_name(parent, name)
            .ok_or_else(|| DomError::MissingChild(name.to_string()))?;
        self.replace_subtree(existing, fragment);
        Ok(existing)
    }

    /// Insert an array item at `index`, shifting following items (their path
    /// segments shift with them, since segments are positional).
    pub fn insert_item(
        &mut self,
        parent: NodeId,
        index: usize,
        fragment: &Fragment,
    ) -> Result<NodeId, DomError> {
        let len = match self.kind(parent) {
            NodeKind::Array { items } => items.len(),
            _ => return Err(DomError::NotAnArray),
        };
        if index > len {
            return Err(DomError::IndexOutOfBounds { index, len });
        }
        let id = self.build("", fragment, parent);
        match &mut self.slots[parent.index()].kind {
            NodeKind::Array { items } => items.insert(index, id),
            _ => unreachable!(),
        }
        Ok(id)
    }

    pub fn remove_item(&mut self, parent: NodeId, index: usize) -> Result<NodeId, DomError> {
        let len = match self.kind(parent) {
            NodeKind::Array { items } => items.len(),
            _ => return Err(DomError::NotAnArray),
        };
        if index >= len {
            return Err(DomError::IndexOutOfBounds { index, len });
        }
        let removed = match &mut self.slots[parent.index()].kind {
            NodeKind::Array { items } => items.remove(index),
            _ => unreachable!(),
        };
        self.slots[removed.index()].parent = None;
        Ok(removed)
    }

    pub fn replace_item(
        &mut self,
        parent: NodeId,
        index: usize,
        fragment: &Fragment,
    ) -> Result<NodeId, DomError> {
        let existing = self.item(parent, index).ok_or_else(|| {
            let len = self.items(parent).len();
            DomError::IndexOutOfBounds { index, len }
        })?;
        self.replace_subtree(existing, fragment);
        Ok(existing)
    }

    /// Overwrite the node at `id` with `fragment`, keeping its identity
    /// (id, name, parent, depth). Old children become detached slots.
    pub fn replace_subtree(&mut self, id: NodeId, fragment: &Fragment) {
        match fragment {
            Fragment::Object(entries) => {
                self.slots[id.index()].kind = NodeKind::Object {
                    children: Vec::new(),
                };
                let children: Vec<NodeId> = entries
                    .iter()
                    .map(|(name, child)| self.build(name, child, id))
                    .collect();
                match &mut self.slots[id.index()].kind {
                    NodeKind::Object { children: slot } => *slot = children,
                    _ => unreachable!(),
                }
            }
            Fragment::Array(fragments) => {
                self.slots[id.index()].kind = NodeKind::Array { items: Vec::new() };
                let items: Vec<NodeId> = fragments
                    .iter()
                    .map(|item| self.build("", item, id))
                    .collect();
                match &mut self.slots[id.index()].kind {
                    NodeKind::Array { items: slot } => *slot = items,
                    _ => unreachable!(),
                }
            }
            Fragment::Value(scalar) => {
                self.slots[id.index()].kind = NodeKind::Value(scalar.clone());
            }
            Fragment::Ref(target) => {
                self.slots[id.index()].kind = NodeKind::Ref {
                    target: target.clone(),
                };
            }
        }
    }

    /// Detach a copy of the subtree at `id`.
    pub fn extract(&self, id: NodeId) -> Fragment {
        match self.kind(id) {
            NodeKind::Object { children } => Fragment::Object(
                children
                    .iter()
                    .map(|child| (self.name(*child).to_string(), self.extract(*child)))
                    .collect(),
            ),
            NodeKind::Array { items } => {
                Fragment::Array(items.iter().map(|item| self.extract(*item)).collect())
            }
            NodeKind::Value(scalar) => Fragment::Value(scalar.clone()),
            NodeKind::Ref { target } => Fragment::Ref(target.clone()),
        }
    }

    /// Deep copy of this tree with detached slots reclaimed.
    pub fn clone_compacted(&self) -> DomTree {
        DomTree::from_fragment(&self.extract(self.root))
    }

    pub fn to_json(&self, id: NodeId) -> serde_json::Value {
        self.extract(id).to_json()
    }

    /// Document-order (depth-first, parents before children) traversal.
    pub fn descendants(&self, from: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![from],
        }
    }

    /// Total nodes in the subtree at `from`, the root included.
    pub fn node_count(&self, from: NodeId) -> usize {
        self.descendants(from).count()
    }

    /// True if any node in the subtree is an unresolved reference.
    pub fn contains_ref(&self, from: NodeId) -> bool {
        self.descendants(from)
            .any(|id| self.kind(id).is_ref())
    }

    /// Structural equality of two subtrees: kinds, exact child names in
    /// order, item order, and exact scalar values.
    pub fn subtree_eq(&self, id: NodeId, other: &DomTree, other_id: NodeId) -> bool {
        match (self.kind(id), other.kind(other_id)) {
            (NodeKind::Object { children: a }, NodeKind::Object { children: b }) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| {
                        self.name(*x) == other.name(*y) && self.subtree_eq(*x, other, *y)
                    })
            }
            (NodeKind::Array { items: a }, NodeKind::Array { items: b }) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| self.subtree_eq(*x, other, *y))
            }
            (NodeKind::Value(a), NodeKind::Value(b)) => a == b,
            (NodeKind::Ref { target: a }, NodeKind::Ref { target: b }) => a == b,
            _ => false,
        }
    }
}

/// Iterator over a subtree in document order.
pub struct Descendants<'t> {
    tree: &'t DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        match self.tree.kind(id) {
            NodeKind::Object { children } => self.stack.extend(children.iter().rev()),
            NodeKind::Array { items } => self.stack.extend(items.iter().rev()),
            _ => {}
        }
        Some(id)
    }
}
