//! Canonical path addressing and key folding.
//!
//! One canonical form is used everywhere: `$root/segment/segment/<index>`,
//! `/`-joined, array indices as numeric segments. This exact string keys the
//! provenance maps and every path-based lookup. Key comparisons fold case
//! after NFC normalization, so `Café` and `cafe\u{301}` collide the way a
//! user expects.

use unicode_normalization::UnicodeNormalization;

/// Name and path of every tree root.
pub const ROOT: &str = "$root";

/// Path separator between segments.
pub const SEPARATOR: char = '/';

/// Fold a key for case-insensitive comparison: NFC-normalize, then lowercase.
pub fn fold_key(name: &str) -> String {
    name.nfc().collect::<String>().to_lowercase()
}

/// Append a segment to a parent path.
pub fn join(parent: &str, segment: &str) -> String {
    let mut path = String::with_capacity(parent.len() + 1 + segment.len());
    path.push_str(parent);
    path.push(SEPARATOR);
    path.push_str(segment);
    path
}

/// Split a path expression into its segments.
///
/// Accepts the canonical `$root/a/b` form, an absolute `/a/b`, and a bare
/// `a/b`; all three address the same node. Empty segments are ignored.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path
        .strip_prefix(ROOT)
        .unwrap_or(path)
        .trim_start_matches(SEPARATOR);
    trimmed.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Fold every segment of a path, keeping the `$root` prefix intact.
pub fn fold_path(path: &str) -> String {
    let mut folded = String::from(ROOT);
    for segment in segments(path) {
        folded.push(SEPARATOR);
        folded.push_str(&fold_key(segment));
    }
    folded
}

/// Render segments into the canonical `$root/...` form.
pub fn from_segments<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut path = String::from(ROOT);
    for segment in parts {
        path.push(SEPARATOR);
        path.push_str(segment);
    }
    path
}
