//! Write-back round trips through the file system: plan, apply, reload,
//! and confirm the reloaded project agrees with the in-memory session.

use std::fs;

use serde_json::json;

use strata::dom::Scalar;
use strata::layer::merge_layer;
use strata::session::EditorSession;
use strata::writeback::plan_layer_writes;

use super::test_utils::{load_project, ProjectBuilder};

#[test]
fn canonical_projects_plan_no_rewrites() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"port": 80, "host": "localhost"}))
        .file("base/app/extra.json", &json!({"flag": true}))
        .build();

    let (_, layers) = load_project(dir.path(), &["base"]);
    let merge = merge_layer(&layers[0]);
    let writes = plan_layer_writes(&layers[0], &merge);
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|write| !write.changed));
}

#[test]
fn compact_files_become_canonical_after_apply() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .raw_file("base/app.json", "{\"port\":1}")
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let mut session = EditorSession::new(engine, layers, None);
    let applied = session.apply_writes("base").unwrap();
    assert!(applied[0].changed);

    let on_disk = fs::read_to_string(dir.path().join("base/app.json")).unwrap();
    assert_eq!(on_disk, "{\n  \"port\": 1\n}\n");

    let (_, reloaded) = load_project(dir.path(), &["base"]);
    let merge = merge_layer(&reloaded[0]);
    let writes = plan_layer_writes(&reloaded[0], &merge);
    assert!(writes.iter().all(|write| !write.changed));
}

#[test]
fn session_edits_apply_to_disk_and_survive_a_fresh_load() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"db": {"host": "localhost"}}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let mut session = EditorSession::new(engine, layers, None);
    session
        .set_scalar(
            "base",
            "$root/app/db/host",
            Scalar::String("db.internal".to_string()),
        )
        .unwrap();
    session.apply_writes("base").unwrap();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    let host = result.resolved.lookup("$root/app/db/host").unwrap();
    assert_eq!(
        result.resolved.to_json(host),
        json!("db.internal")
    );
}

#[test]
fn edits_touch_only_the_owning_file() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"port": 80}))
        .file("base/app/extra.json", &json!({"flag": true}))
        .build();
    let extra_before = fs::read_to_string(dir.path().join("base/app/extra.json")).unwrap();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let mut session = EditorSession::new(engine, layers, None);
    session
        .set_scalar("base", "$root/app/port", Scalar::Number(8080.into()))
        .unwrap();
    let applied = session.apply_writes("base").unwrap();
    let changed: Vec<&str> = applied
        .iter()
        .filter(|write| write.changed)
        .map(|write| write.relative.as_str())
        .collect();
    assert_eq!(changed, vec!["app.json"]);

    let extra_after = fs::read_to_string(dir.path().join("base/app/extra.json")).unwrap();
    assert_eq!(extra_before, extra_after);
}

#[test]
fn removed_contributions_leave_an_empty_object_on_disk() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/feature.json", &json!({"flag": true}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let mut session = EditorSession::new(engine, layers, None);
    session.remove_value("base", "$root/feature/flag").unwrap();
    session.apply_writes("base").unwrap();

    let on_disk = fs::read_to_string(dir.path().join("base/feature.json")).unwrap();
    assert_eq!(on_disk, "{}\n");

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let result = engine.refresh(None, &layers).unwrap();
    let feature = result.resolved.lookup("$root/feature").unwrap();
    assert_eq!(result.resolved.to_json(feature), json!({}));
}
