//! Schema model, defaults synthesis, and validation.

pub mod defaults;
pub mod node;
pub mod validator;

pub use defaults::schema_defaults;
pub use node::{Range, SchemaKind, SchemaNode};
pub use validator::{validate, RuleKind, Severity, ValidationIssue};
