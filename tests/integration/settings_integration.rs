//! Settings precedence across all sources: compiled defaults, the global
//! config file, the project file, an explicit `--config` file, then
//! `STRATA__*` environment variables.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use strata::engine::Engine;
use strata::layer::LayerDefinition;
use strata::settings::EngineSettings;

use super::test_utils::with_env_vars;

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// A settings-source fixture: a project directory plus an isolated global
/// config directory the `STRATA_CONFIG_DIR` seam points at.
struct Sources {
    dir: TempDir,
}

impl Sources {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("global")).unwrap();
        Sources { dir }
    }

    fn project(&self) -> &Path {
        self.dir.path()
    }

    fn global_dir(&self) -> String {
        self.dir.path().join("global").to_str().unwrap().to_string()
    }

    fn global_file(&self, text: &str) -> &Self {
        write(&self.dir.path().join("global/config.toml"), text);
        self
    }

    fn project_file(&self, text: &str) -> &Self {
        write(&self.dir.path().join("strata.toml"), text);
        self
    }
}

#[test]
fn compiled_defaults_apply_without_any_sources() {
    let sources = Sources::new();
    let global = sources.global_dir();
    let settings = with_env_vars(
        &[
            ("STRATA_CONFIG_DIR", Some(global.as_str())),
            ("STRATA__LOGGING__LEVEL", None),
            ("STRATA__SCAN__FOLLOW_SYMLINKS", None),
            ("STRATA__INTEGRITY__CASING", None),
        ],
        || EngineSettings::load(sources.project(), None).unwrap(),
    );
    assert_eq!(settings, EngineSettings::default());
}

#[test]
fn global_file_loads_through_the_config_dir_seam() {
    let sources = Sources::new();
    sources.global_file("[logging]\nlevel = \"debug\"\n");
    let global = sources.global_dir();
    let settings = with_env_vars(
        &[
            ("STRATA_CONFIG_DIR", Some(global.as_str())),
            ("STRATA__LOGGING__LEVEL", None),
        ],
        || EngineSettings::load(sources.project(), None).unwrap(),
    );
    assert_eq!(settings.logging.level, "debug");
}

#[test]
fn project_file_overrides_the_global_file() {
    let sources = Sources::new();
    sources
        .global_file("[logging]\nlevel = \"debug\"\n[integrity]\ncasing = false\n")
        .project_file("[logging]\nlevel = \"warn\"\n");
    let global = sources.global_dir();
    let settings = with_env_vars(
        &[
            ("STRATA_CONFIG_DIR", Some(global.as_str())),
            ("STRATA__LOGGING__LEVEL", None),
        ],
        || EngineSettings::load(sources.project(), None).unwrap(),
    );
    assert_eq!(settings.logging.level, "warn");
    // sections the project file does not touch keep the global values
    assert!(!settings.integrity.casing);
}

#[test]
fn explicit_config_file_overrides_the_project_file() {
    let sources = Sources::new();
    sources.project_file("[logging]\nlevel = \"warn\"\n");
    let explicit = sources.project().join("override.toml");
    write(&explicit, "[logging]\nlevel = \"error\"\n");
    let global = sources.global_dir();
    let settings = with_env_vars(
        &[
            ("STRATA_CONFIG_DIR", Some(global.as_str())),
            ("STRATA__LOGGING__LEVEL", None),
        ],
        || EngineSettings::load(sources.project(), Some(&explicit)).unwrap(),
    );
    assert_eq!(settings.logging.level, "error");
}

#[test]
fn environment_overrides_every_file_source() {
    let sources = Sources::new();
    sources
        .global_file("[logging]\nlevel = \"debug\"\n")
        .project_file("[logging]\nlevel = \"warn\"\n[scan]\nfollow_symlinks = false\n");
    let global = sources.global_dir();
    let settings = with_env_vars(
        &[
            ("STRATA_CONFIG_DIR", Some(global.as_str())),
            ("STRATA__LOGGING__LEVEL", Some("trace")),
            ("STRATA__SCAN__FOLLOW_SYMLINKS", Some("true")),
        ],
        || EngineSettings::load(sources.project(), None).unwrap(),
    );
    assert_eq!(settings.logging.level, "trace");
    assert!(settings.scan.follow_symlinks);
}

#[test]
fn scan_settings_shape_the_layer_walk() {
    let sources = Sources::new();
    sources.project_file("[scan]\nignore_patterns = [\".git\", \"legacy\"]\n");
    write(&sources.project().join("base/app.json"), "{\"port\": 1}");
    write(&sources.project().join("base/legacy/old.json"), "{\"port\": 2}");
    write(&sources.project().join("base/.git/blob.json"), "{}");

    let global = sources.global_dir();
    let layer = with_env_vars(
        &[
            ("STRATA_CONFIG_DIR", Some(global.as_str())),
            ("STRATA__SCAN__IGNORE_PATTERNS", None),
        ],
        || {
            let settings = EngineSettings::load(sources.project(), None).unwrap();
            let engine = Engine::new(settings);
            engine
                .load_layer(&LayerDefinition::new("base", sources.project().join("base")))
                .unwrap()
        },
    );
    let names: Vec<&str> = layer.files.iter().map(|file| file.relative.as_str()).collect();
    assert_eq!(names, vec!["app.json"]);
}
