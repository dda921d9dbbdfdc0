//! Configuration document model: the arena tree, node kinds, and the
//! canonical path scheme shared by every stage of the pipeline.

pub mod node;
pub mod path;
pub mod tree;

pub use node::{NodeId, NodeKind, Scalar};
pub use tree::{Descendants, DomTree, Fragment};
