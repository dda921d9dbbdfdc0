//! Shared test utilities for integration tests
//!
//! Provides a project fixture builder and serialized environment-variable
//! access so settings tests stay isolated when run in parallel.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use serde_json::json;
use tempfile::TempDir;

use strata::engine::Engine;
use strata::layer::{LayerDefinition, LoadedLayer};
use strata::schema::SchemaNode;

/// Serializes environment mutation across tests; `config` reads the process
/// environment, so concurrent mutation would bleed between tests.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with the given variables set (`Some`) or removed (`None`),
/// restoring the previous state afterwards.
pub fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let previous: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(name, _)| ((*name).to_string(), std::env::var(name).ok()))
        .collect();
    for (name, value) in vars {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }
    let result = f();
    for (name, value) in previous {
        match value {
            Some(value) => std::env::set_var(&name, value),
            None => std::env::remove_var(&name),
        }
    }
    result
}

/// Builds a temporary project directory: manifest, layer folders, schema
/// files. Files written through `file` use the canonical pretty rendering,
/// so a freshly built project is already `fmt`-clean.
pub struct ProjectBuilder {
    dir: TempDir,
    layers: Vec<(String, String)>,
    schema_globs: Vec<String>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        ProjectBuilder {
            dir: TempDir::new().expect("create tempdir"),
            layers: Vec::new(),
            schema_globs: Vec::new(),
        }
    }

    /// Declare a layer whose folder matches its name.
    pub fn layer(mut self, name: &str) -> Self {
        self.layers.push((name.to_string(), name.to_string()));
        self
    }

    pub fn schema_glob(mut self, glob: &str) -> Self {
        self.schema_globs.push(glob.to_string());
        self
    }

    /// Write a JSON file (project-relative path) in canonical form.
    pub fn file(self, relative: &str, value: &serde_json::Value) -> Self {
        let mut text = serde_json::to_string_pretty(value).expect("render fixture JSON");
        text.push('\n');
        self.raw_file(relative, &text)
    }

    /// Write raw text (for malformed or non-canonical fixtures).
    pub fn raw_file(self, relative: &str, text: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dirs");
        }
        fs::write(path, text).expect("write fixture file");
        self
    }

    /// Write arbitrary text to the project's `strata.toml` settings file.
    pub fn settings(self, toml_text: &str) -> Self {
        self.raw_file("strata.toml", toml_text)
    }

    /// Write the manifest and hand back the project directory.
    pub fn build(self) -> TempDir {
        let layers: Vec<serde_json::Value> = self
            .layers
            .iter()
            .map(|(name, folder)| json!({"name": name, "folder": folder}))
            .collect();
        let manifest = json!({"layers": layers, "schema": self.schema_globs});
        let text = serde_json::to_string_pretty(&manifest).expect("render manifest");
        fs::write(self.dir.path().join("strata.json"), text).expect("write manifest");
        for (_, folder) in &self.layers {
            fs::create_dir_all(self.dir.path().join(folder)).expect("create layer folder");
        }
        self.dir
    }
}

/// Load every layer of a built project with a default engine.
pub fn load_project(dir: &Path, layers: &[&str]) -> (Engine, Vec<LoadedLayer>) {
    let engine = Engine::default();
    let loaded = layers
        .iter()
        .map(|name| {
            engine
                .load_layer(&LayerDefinition::new(*name, dir.join(name)))
                .expect("load layer")
        })
        .collect();
    (engine, loaded)
}

/// Load the project's schema through the manifest, if it declares one.
pub fn load_schema(dir: &Path) -> Option<SchemaNode> {
    strata::project::Project::load(dir)
        .expect("load project")
        .load_schema()
        .expect("load schema")
}
