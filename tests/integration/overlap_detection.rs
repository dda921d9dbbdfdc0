//! Same-layer conflict detection: true overlaps, first-writer retention,
//! and the case-collision hard failure.

use serde_json::json;

use strata::error::LoadError;
use strata::layer::{LayerDefinition, LayerIssue};
use strata::runtime::ResolvedConfig;

use super::test_utils::{load_project, ProjectBuilder};

#[test]
fn same_layer_overlap_reports_exactly_one_issue_naming_both_files() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/svc.json", &json!({"port": 1}))
        .file("base/svc/port.json", &json!({"unreachable": true}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();

    let overlaps: Vec<&LayerIssue> = result
        .layer_issues()
        .filter(|issue| matches!(issue, LayerIssue::Overlap { .. }))
        .collect();
    assert_eq!(overlaps.len(), 1);
    match overlaps[0] {
        LayerIssue::Overlap { path, first, second } => {
            assert_eq!(path, "$root/svc/port");
            assert_eq!(first, "svc.json");
            assert_eq!(second, "svc/port.json");
        }
        other => panic!("expected overlap, got {other:?}"),
    }

    // The first writer's value survives into the resolved tree.
    let config = ResolvedConfig::new(result.resolved.clone());
    assert_eq!(config.get_i64("$root/svc/port"), Some(1));
}

#[test]
fn key_level_overlap_spares_the_rest_of_the_file() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"shared": 1}))
        .file("base/app/more.json", &json!({"extra": 2}))
        .file("base/app2.json", &json!({"other": 3}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert!(result.is_clean());
    let config = ResolvedConfig::new(result.resolved.clone());
    assert_eq!(config.get_i64("$root/app/shared"), Some(1));
    assert_eq!(config.get_i64("$root/app/more/extra"), Some(2));
    assert_eq!(config.get_i64("$root/app2/other"), Some(3));
}

#[test]
fn cross_layer_redefinition_is_an_override_not_an_overlap() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .layer("prod")
        .file("base/app.json", &json!({"port": 80}))
        .file("prod/app.json", &json!({"port": 443}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base", "prod"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert!(result.is_clean());
}

#[test]
fn malformed_files_are_skipped_and_reported() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .raw_file("base/broken.json", "{ not json")
        .file("base/app.json", &json!({"port": 80}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    assert_eq!(layers[0].files.len(), 1);
    assert!(layers[0]
        .issues
        .iter()
        .any(|issue| matches!(issue, LayerIssue::Parse { .. })));

    let result = engine.refresh(None, &layers).unwrap();
    assert!(result.resolved.lookup("$root/app/port").is_some());
}

#[test]
fn non_object_roots_are_skipped_and_reported() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/list.json", &json!([1, 2, 3]))
        .file("base/app.json", &json!({"port": 80}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    assert!(result
        .layer_issues()
        .any(|issue| matches!(issue, LayerIssue::Structural { .. })));
    assert!(result.resolved.lookup("$root/list").is_none());
}

#[test]
fn case_colliding_file_paths_abort_the_layer_load() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"a": 1}))
        .file("base/App.json", &json!({"b": 2}))
        .build();

    let engine = strata::engine::Engine::default();
    let err = engine
        .load_layer(&LayerDefinition::new("base", dir.path().join("base")))
        .unwrap_err();
    assert!(matches!(err, LoadError::CaseCollision { .. }));
}
