//! Strata: Layered JSON Configuration Resolution
//!
//! Resolves a layered, multi-file JSON configuration project into one
//! effective, queryable tree: per-layer merge with conflict detection,
//! cascading merge with full provenance, `$ref` resolution, schema
//! validation, and cross-layer integrity checks.

pub mod cascade;
pub mod cli;
pub mod dom;
pub mod engine;
pub mod error;
pub mod integrity;
pub mod layer;
pub mod logging;
pub mod progress;
pub mod project;
pub mod resolve;
pub mod runtime;
pub mod schema;
pub mod session;
pub mod settings;
pub mod writeback;
