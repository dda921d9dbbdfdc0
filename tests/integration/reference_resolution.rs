//! Reference resolution across the full pipeline: refs see the cascaded
//! tree, so a reference can point at a value another layer overrode.

use serde_json::json;

use strata::resolve::ResolveIssue;
use strata::runtime::ResolvedConfig;

use super::test_utils::{load_project, ProjectBuilder};

#[test]
fn references_resolve_against_the_cascaded_tree() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .layer("prod")
        .file(
            "base/app.json",
            &json!({"primary": {"$ref": "/database/host"}}),
        )
        .file("base/database.json", &json!({"host": "localhost"}))
        .file("prod/database.json", &json!({"host": "db.internal"}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base", "prod"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert!(result.reference_errors.is_empty());

    // The ref captured the prod override, not the base value.
    let config = ResolvedConfig::new(result.resolved.clone());
    assert_eq!(config.get_str("$root/app/primary"), Some("db.internal"));
}

#[test]
fn chained_references_resolve_in_passes() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file(
            "base/app.json",
            &json!({
                "a": {"$ref": "/app/b"},
                "b": {"$ref": "/app/c"},
                "c": 42
            }),
        )
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert!(result.reference_errors.is_empty());
    let config = ResolvedConfig::new(result.resolved.clone());
    assert_eq!(config.get_i64("$root/app/a"), Some(42));
    assert_eq!(config.get_i64("$root/app/b"), Some(42));
}

#[test]
fn cycles_are_reported_without_hanging() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file(
            "base/app.json",
            &json!({
                "a": {"$ref": "/app/b"},
                "b": {"$ref": "/app/a"}
            }),
        )
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert_eq!(result.reference_errors.len(), 2);
    assert!(result
        .reference_errors
        .iter()
        .all(|issue| matches!(issue, ResolveIssue::Cycle { .. })));

    // The unresolved refs remain in wire form in the resolved tree.
    let id = result.resolved.lookup("$root/app/a").unwrap();
    assert!(result.resolved.kind(id).is_ref());
}

#[test]
fn missing_and_external_targets_are_classified() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file(
            "base/app.json",
            &json!({
                "gone": {"$ref": "/nowhere"},
                "web": {"$ref": "https://example.com/config"}
            }),
        )
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert_eq!(result.reference_errors.len(), 2);
    assert!(result
        .reference_errors
        .iter()
        .any(|issue| matches!(issue, ResolveIssue::Missing { .. })));
    assert!(result
        .reference_errors
        .iter()
        .any(|issue| matches!(issue, ResolveIssue::External { .. })));
}

#[test]
fn reference_to_a_whole_subtree_clones_it() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file(
            "base/app.json",
            &json!({
                "fallback": {"$ref": "/database"},
                "attempts": 2
            }),
        )
        .file("base/database.json", &json!({"host": "localhost", "port": 5432}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert!(result.reference_errors.is_empty());
    let config = ResolvedConfig::new(result.resolved.clone());
    assert_eq!(config.get_str("$root/app/fallback/host"), Some("localhost"));
    assert_eq!(config.get_i64("$root/app/fallback/port"), Some(5432));

    // The pre-resolution tree still carries the ref for the editor.
    let id = result.merged.lookup("$root/app/fallback").unwrap();
    assert!(result.merged.kind(id).is_ref());
}
