//! Schema-driven validation.
//!
//! Pure and stateless: one document-order walk over the DOM with the schema
//! tree alongside, every finding appended to one ordered issue list.
//! Identical inputs always produce the identical list.

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::dom::{path, DomTree, NodeId, NodeKind, Scalar};
use crate::schema::node::{SchemaKind, SchemaNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{}", name)
    }
}

/// Which rule produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Kind,
    Required,
    Range,
    Allowed,
    Pattern,
    Unschematized,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Kind => "kind",
            RuleKind::Required => "required",
            RuleKind::Range => "range",
            RuleKind::Allowed => "allowed",
            RuleKind::Pattern => "pattern",
            RuleKind::Unschematized => "unschematized",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{severity} at {path}: {message}")]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub severity: Severity,
    pub rule: RuleKind,
}

impl ValidationIssue {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Validate a DOM tree (resolved, or an editor preview) against a schema
/// tree matched by path.
#[instrument(skip_all)]
pub fn validate(tree: &DomTree, schema: &SchemaNode) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_node(tree, tree.root(), schema, &mut issues);
    debug!(issues = issues.len(), "validation finished");
    issues
}

fn check_node(tree: &DomTree, id: NodeId, schema: &SchemaNode, issues: &mut Vec<ValidationIssue>) {
    // Lingering references are the resolver's diagnostics, not ours.
    if tree.kind(id).is_ref() {
        return;
    }

    if !kind_compatible(schema.kind, tree.kind(id)) {
        issues.push(ValidationIssue {
            path: tree.path(id),
            message: format!(
                "expected {}, found {}",
                schema.kind,
                tree.kind(id).kind_name()
            ),
            severity: Severity::Error,
            rule: RuleKind::Kind,
        });
        return;
    }

    match tree.kind(id) {
        NodeKind::Object { .. } => {
            for (name, property) in &schema.properties {
                if property.required && tree.child_by_name(id, name).is_none() {
                    issues.push(ValidationIssue {
                        path: path::join(&tree.path(id), name),
                        message: format!("required property {:?} is missing", name),
                        severity: Severity::Error,
                        rule: RuleKind::Required,
                    });
                }
            }
            // A schema with no properties leaves the object open; one with
            // properties marks everything unlisted as unschematized.
            let open = schema.properties.is_empty();
            for child in tree.children(id) {
                match schema.property(tree.name(*child)) {
                    Some((_, property)) => check_node(tree, *child, property, issues),
                    None if open => {}
                    None => flag_unschematized(tree, *child, issues),
                }
            }
        }
        NodeKind::Array { items } => {
            if let Some(item_schema) = &schema.item {
                for item in items {
                    check_node(tree, *item, item_schema, issues);
                }
            }
        }
        NodeKind::Value(scalar) => check_scalar(tree, id, schema, scalar, issues),
        NodeKind::Ref { .. } => {}
    }
}

/// Flag the topmost node with no schema; its descendants are implied.
fn flag_unschematized(tree: &DomTree, id: NodeId, issues: &mut Vec<ValidationIssue>) {
    issues.push(ValidationIssue {
        path: tree.path(id),
        message: "no schema for this path".to_string(),
        severity: Severity::Info,
        rule: RuleKind::Unschematized,
    });
}

fn kind_compatible(expected: SchemaKind, actual: &NodeKind) -> bool {
    match expected {
        SchemaKind::Any => true,
        SchemaKind::Object => actual.is_object(),
        SchemaKind::Array => actual.is_array(),
        SchemaKind::String => matches!(actual, NodeKind::Value(Scalar::String(_))),
        SchemaKind::Number => matches!(actual, NodeKind::Value(Scalar::Number(_))),
        SchemaKind::Boolean => matches!(actual, NodeKind::Value(Scalar::Bool(_))),
    }
}

fn check_scalar(
    tree: &DomTree,
    id: NodeId,
    schema: &SchemaNode,
    scalar: &Scalar,
    issues: &mut Vec<ValidationIssue>,
) {
    if !schema.allowed.is_empty() {
        let permitted = schema.allowed.iter().any(|candidate| {
            Scalar::from_json(candidate)
                .map(|allowed| scalar.loosely_equals(&allowed))
                .unwrap_or(false)
        });
        if !permitted {
            issues.push(ValidationIssue {
                path: tree.path(id),
                message: format!("value {} is not an allowed value", scalar),
                severity: Severity::Error,
                rule: RuleKind::Allowed,
            });
        }
    }

    if let (Some(range), Some(number)) = (&schema.range, scalar.as_f64()) {
        let below = range.min.map(|min| number < min).unwrap_or(false);
        let above = range.max.map(|max| number > max).unwrap_or(false);
        if below || above {
            issues.push(ValidationIssue {
                path: tree.path(id),
                message: format!(
                    "value {} is outside the range [{}, {}]",
                    scalar,
                    range.min.map_or("-inf".to_string(), |min| min.to_string()),
                    range.max.map_or("+inf".to_string(), |max| max.to_string()),
                ),
                severity: Severity::Error,
                rule: RuleKind::Range,
            });
        }
    }

    if let (Some(pattern), Some(text)) = (&schema.pattern, scalar.as_str()) {
        match regex_lite::Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => {
                if !regex.is_match(text) {
                    issues.push(ValidationIssue {
                        path: tree.path(id),
                        message: format!("{:?} does not match pattern {:?}", text, pattern),
                        severity: Severity::Error,
                        rule: RuleKind::Pattern,
                    });
                }
            }
            Err(source) => issues.push(ValidationIssue {
                path: tree.path(id),
                message: format!("schema pattern {:?} is invalid: {}", pattern, source),
                severity: Severity::Warning,
                rule: RuleKind::Pattern,
            }),
        }
    }
}
