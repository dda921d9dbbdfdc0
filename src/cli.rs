//! CLI module: clap definitions, route table, presentation, error mapping.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_explain_json, format_explain_text, format_integrity_json, format_integrity_text,
    format_resolve_json, format_validation_json, format_validation_text, format_writes_text,
};
pub use route::{CommandOutput, Explanation, RunContext};
