//! The schema tree the validator consumes.
//!
//! Schema acquisition is an external concern: whoever produces the schema
//! hands the engine one `SchemaNode` tree, usually by deserializing a JSON
//! schema-tree document (see the project manifest's `schema` globs). The
//! engine never scans attributes itself.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::path;

/// Declared kind for a schema position. `Any` places no kind constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    #[default]
    Any,
    Object,
    Array,
    String,
    Number,
    Boolean,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaKind::Any => "any",
            SchemaKind::Object => "object",
            SchemaKind::Array => "array",
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// One position in the schema tree. Property keys carry the canonical
/// casing for their path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub required: bool,
    /// Default value contributed to the schema-defaults pseudo-layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Allowed-value set; empty means unconstrained.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<serde_json::Value>,
    /// Full-match regex constraint for string values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    /// Child schemas for Object positions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,
    /// Item schema for Array positions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<SchemaNode>>,
}

impl SchemaNode {
    /// Case-insensitive property lookup; returns the canonical key too.
    pub fn property(&self, name: &str) -> Option<(&str, &SchemaNode)> {
        let folded = path::fold_key(name);
        self.properties
            .iter()
            .find(|(key, _)| path::fold_key(key) == folded)
            .map(|(key, node)| (key.as_str(), node))
    }

    /// Walk a `/`-separated path expression to the schema node for it.
    /// Numeric segments descend into the item schema.
    pub fn find(&self, expr: &str) -> Option<&SchemaNode> {
        let mut current = self;
        for segment in path::segments(expr) {
            current = if let Some((_, child)) = current.property(segment) {
                child
            } else if segment.bytes().all(|b| b.is_ascii_digit()) {
                current.item.as_deref()?
            } else {
                return None;
            };
        }
        Some(current)
    }
}
