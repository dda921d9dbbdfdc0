//! CLI output: error mapping from engine errors to stable CLI surface.

use crate::error::LoadError;

/// Map engine errors to a string for CLI output.
/// Keeps route handlers thin; extend with stable categories if needed.
pub fn map_error(err: &LoadError) -> String {
    err.to_string()
}
