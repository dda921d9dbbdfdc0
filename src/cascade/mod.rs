//! Cascading merge: schema defaults plus ordered layers, low to high
//! priority, folded into one tree with full provenance.

pub mod merge;
pub mod provenance;

pub use merge::{cascade, CascadeResult};
pub use provenance::{Provenance, ValueOrigin};
