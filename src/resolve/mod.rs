//! `$ref` elimination: turns the cascade's merged tree into the resolved
//! tree the runtime consumes.

pub mod refs;
pub mod resolver;

pub use refs::is_external;
pub use resolver::{resolve_refs, ResolveIssue, ResolveResult};
