//! Advisory integrity checks over real project directories, including the
//! `check` command and the settings switches for the advisory families.

use serde_json::json;

use strata::cli::{Commands, OutputFormat, RunContext};
use strata::integrity::IntegrityWarning;

use super::test_utils::{load_project, load_schema, with_env_vars, ProjectBuilder};

#[test]
fn overlapping_definitions_on_disk_are_reported() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/svc.json", &json!({"port": 1}))
        .file("base/svc/port.json", &json!({"limit": 9}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let report = engine.check_integrity(&layers, None);

    let overlaps: Vec<_> = report
        .warnings
        .iter()
        .filter(|warning| matches!(warning, IntegrityWarning::TrueOverlap { .. }))
        .collect();
    assert_eq!(
        overlaps,
        vec![&IntegrityWarning::TrueOverlap {
            layer: "base".to_string(),
            path: "$root/svc/port".to_string(),
            files: vec!["svc.json".to_string(), "svc/port.json".to_string()],
        }]
    );
}

#[test]
fn placement_drift_across_layers_is_reported() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .layer("prod")
        .file("base/database.json", &json!({"host": "a"}))
        .file("prod/database/pool.json", &json!({"size": 4}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base", "prod"]);
    let report = engine.check_integrity(&layers, None);

    assert_eq!(report.len(), 1);
    match &report.warnings[0] {
        IntegrityWarning::Placement { path, locations } => {
            assert_eq!(path, "$root/database");
            assert!(locations
                .iter()
                .any(|site| site == "base:database.json as database.json"));
            assert!(locations
                .iter()
                .any(|site| site == "prod:database/pool.json as database"));
        }
        other => panic!("expected placement drift, got {other:?}"),
    }
}

#[test]
fn casing_drift_between_layers_is_reported() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .layer("prod")
        .file("base/app.json", &json!({"Timeout": 30}))
        .file("prod/app.json", &json!({"timeout": 60}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base", "prod"]);
    let report = engine.check_integrity(&layers, None);

    assert_eq!(report.len(), 1);
    match &report.warnings[0] {
        IntegrityWarning::Casing {
            path,
            spellings,
            locations,
        } => {
            assert_eq!(path, "$root/app/timeout");
            assert_eq!(
                spellings,
                &vec!["Timeout".to_string(), "timeout".to_string()]
            );
            assert_eq!(locations.len(), 2);
        }
        other => panic!("expected casing drift, got {other:?}"),
    }
}

#[test]
fn schema_fixes_the_canonical_casing_of_mount_segments() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .schema_glob("schema/*.json")
        .file(
            "schema/root.json",
            &json!({
                "kind": "object",
                "properties": {"Database": {"kind": "object"}}
            }),
        )
        .file("base/database/conn.json", &json!({"host": "a"}))
        .build();

    let (engine, layers) = load_project(dir.path(), &["base"]);
    let schema = load_schema(dir.path()).unwrap();
    let report = engine.check_integrity(&layers, Some(&schema));

    assert_eq!(
        report.warnings,
        vec![IntegrityWarning::SchemaCasing {
            layer: "base".to_string(),
            file: "database/conn.json".to_string(),
            path: "$root/Database".to_string(),
            found: "database".to_string(),
            canonical: "Database".to_string(),
        }]
    );
}

#[test]
fn project_settings_mute_advisory_families_through_the_cli() {
    // Placement drift (file form vs directory form in prod) plus casing
    // drift (ttl vs TTL); no true overlap.
    let files = [
        ("base/database.json", json!({"ttl": 1})),
        ("prod/database.json", json!({"TTL": 2})),
        ("prod/database/pool.json", json!({"size": 8})),
    ];

    let mut loud = ProjectBuilder::new().layer("base").layer("prod");
    for (path, value) in &files {
        loud = loud.file(path, value);
    }
    let loud = loud.build();

    let mut muted = ProjectBuilder::new()
        .layer("base")
        .layer("prod")
        .settings("[integrity]\ncasing = false\nplacement = false\n");
    for (path, value) in &files {
        muted = muted.file(path, value);
    }
    let muted = muted.build();

    let global = loud.path().join("global");
    let (loud_output, muted_output) = with_env_vars(
        &[("STRATA_CONFIG_DIR", Some(global.to_str().unwrap()))],
        || {
            let loud_output = RunContext::new(loud.path().to_path_buf(), None)
                .unwrap()
                .execute(&Commands::Check {
                    format: OutputFormat::Json,
                })
                .unwrap();
            let muted_output = RunContext::new(muted.path().to_path_buf(), None)
                .unwrap()
                .execute(&Commands::Check {
                    format: OutputFormat::Text,
                })
                .unwrap();
            (loud_output, muted_output)
        },
    );

    assert!(!loud_output.failing);
    assert!(loud_output.text.contains("Placement"));
    assert!(loud_output.text.contains("Casing"));

    assert!(!muted_output.failing);
    assert!(muted_output.text.contains("no warnings"));
}
