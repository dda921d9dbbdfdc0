//! Reference target classification.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Matches a URI scheme prefix (`http:`, `https:`, `file:`, ...).
fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("scheme pattern is valid")
    })
}

/// True when a reference target points outside the tree entirely. External
/// targets are never resolved here; they pass through untouched so a later
/// consumer can fetch them.
pub fn is_external(target: &str) -> bool {
    scheme_pattern().is_match(target)
}
