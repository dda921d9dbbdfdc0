//! Progress reporting and cooperative cancellation observed end to end:
//! scan events per file, stage events per refresh, and the guarantee that a
//! cancelled refresh leaves the previous session result in place.

use std::sync::Arc;

use serde_json::json;

use strata::dom::Scalar;
use strata::engine::Engine;
use strata::error::LoadError;
use strata::layer::LayerDefinition;
use strata::progress::{CollectingSink, ProgressEvent};
use strata::session::EditorSession;

use super::test_utils::ProjectBuilder;

fn observed_engine() -> (Engine, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let engine = Engine::default().with_progress(sink.clone());
    (engine, sink)
}

#[test]
fn scanning_reports_start_each_file_and_finish() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"port": 1}))
        .file("base/db.json", &json!({"host": "x"}))
        .build();

    let (engine, sink) = observed_engine();
    engine
        .load_layer(&LayerDefinition::new("base", dir.path().join("base")))
        .unwrap();

    let events = sink.events();
    assert_eq!(
        events[0],
        ProgressEvent::LayerScanStarted {
            layer: "base".to_string()
        }
    );
    assert_eq!(
        events[1],
        ProgressEvent::LayerScanFinished {
            layer: "base".to_string(),
            files: 2,
        }
    );
    let parsed: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::FileParsed { file, .. } => Some(file.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(parsed, vec!["app.json", "db.json"]);
}

#[test]
fn a_full_refresh_walks_the_stages_in_order() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .layer("prod")
        .file("base/app.json", &json!({"port": 1}))
        .file("prod/app.json", &json!({"port": 2}))
        .build();

    let (engine, sink) = observed_engine();
    let layers = vec![
        engine
            .load_layer(&LayerDefinition::new("base", dir.path().join("base")))
            .unwrap(),
        engine
            .load_layer(&LayerDefinition::new("prod", dir.path().join("prod")))
            .unwrap(),
    ];
    engine.refresh(None, &layers).unwrap();

    let events = sink.events();
    let merged: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::LayerMerged { layer, .. } => Some(layer.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(merged, vec!["base", "prod"]);

    let cascade_at = events
        .iter()
        .position(|event| matches!(event, ProgressEvent::CascadeMerged { layers: 2 }))
        .unwrap();
    let resolve_at = events
        .iter()
        .position(|event| matches!(event, ProgressEvent::ReferencesResolved { .. }))
        .unwrap();
    assert!(cascade_at < resolve_at);
}

#[test]
fn cancellation_aborts_the_scan_with_a_hard_error() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"port": 1}))
        .build();

    let engine = Engine::default();
    engine.cancel_token().cancel();
    let err = engine
        .load_layer(&LayerDefinition::new("base", dir.path().join("base")))
        .unwrap_err();
    assert!(matches!(err, LoadError::Cancelled));
}

#[test]
fn a_cancelled_refresh_keeps_the_previous_session_result() {
    let dir = ProjectBuilder::new()
        .layer("base")
        .file("base/app.json", &json!({"port": 1}))
        .build();

    let engine = Engine::default();
    let cancel = engine.cancel_token();
    let layers = vec![engine
        .load_layer(&LayerDefinition::new("base", dir.path().join("base")))
        .unwrap()];
    let mut session = EditorSession::new(engine, layers, None);
    session.refresh().unwrap();

    session
        .set_scalar("base", "$root/app/port", Scalar::Number(2.into()))
        .unwrap();
    cancel.cancel();
    assert!(matches!(session.refresh(), Err(LoadError::Cancelled)));

    // The committed result still shows the pre-edit value.
    let result = session.result().unwrap();
    let port = result.resolved.lookup("$root/app/port").unwrap();
    assert_eq!(result.resolved.to_json(port), json!(1));
}
