//! Node kinds and scalar values for the configuration DOM.

use serde::{Deserialize, Serialize};

/// Index of a node inside its owning [`DomTree`](crate::dom::DomTree) arena.
///
/// Ids are only meaningful within the tree that issued them; the arena is the
/// exclusive owner of every node, and parent links are plain ids, never
/// owning references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Leaf value: the JSON scalar set.
///
/// Numbers keep their `serde_json` representation so integers, floats, and
/// precision survive a parse/serialize round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Equality with numeric coercion: `1` matches `1.0`. Strings and bools
    /// compare exactly; null only matches null.
    pub fn loosely_equals(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => {
                if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                    return x == y;
                }
                if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
                    return x == y;
                }
                match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
            _ => self == other,
        }
    }

    /// Convert a scalar `serde_json` value. Objects and arrays return `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Scalar> {
        match value {
            serde_json::Value::Null => Some(Scalar::Null),
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Some(Scalar::Number(n.clone())),
            serde_json::Value::String(s) => Some(Scalar::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Number(n) => serde_json::Value::Number(n.clone()),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Number(_) => "number",
            Scalar::String(_) => "string",
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// The closed node-kind set. The engine dispatches on this exhaustively;
/// there is no open hierarchy to probe at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Ordered children, keys case-insensitive-unique within this object.
    Object { children: Vec<NodeId> },
    /// Ordered items; an item's path segment is its current position.
    Array { items: Vec<NodeId> },
    /// A scalar leaf.
    Value(Scalar),
    /// An unresolved symbolic reference (`{"$ref": "<path>"}` on the wire).
    Ref { target: String },
}

impl NodeKind {
    pub fn is_object(&self) -> bool {
        matches!(self, NodeKind::Object { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, NodeKind::Array { .. })
    }

    pub fn is_value(&self) -> bool {
        matches!(self, NodeKind::Value(_))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, NodeKind::Ref { .. })
    }

    /// Human-readable kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Object { .. } => "object",
            NodeKind::Array { .. } => "array",
            NodeKind::Value(scalar) => scalar.kind_name(),
            NodeKind::Ref { .. } => "reference",
        }
    }
}
