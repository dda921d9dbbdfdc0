//! Engine settings, layered the usual way: compiled defaults, then the
//! global config file, then the project file, then an explicit `--config`
//! file, then `STRATA__*` environment variables. Later sources win.

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::logging::LoggingConfig;

pub mod sources;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineSettings {
    pub logging: LoggingConfig,
    pub scan: ScanSettings,
    pub integrity: IntegritySettings,
}

/// Controls for the layer directory walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
    /// Glob patterns matched against individual path components; a matching
    /// directory is skipped with everything under it.
    pub ignore_patterns: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            follow_symlinks: false,
            max_depth: None,
            ignore_patterns: vec![".git".to_string()],
        }
    }
}

/// Which advisory integrity checks run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegritySettings {
    pub casing: bool,
    pub placement: bool,
}

impl Default for IntegritySettings {
    fn default() -> Self {
        IntegritySettings {
            casing: true,
            placement: true,
        }
    }
}

fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, LoadError> {
    let builder = Config::builder()
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stdout")?
        .set_default("logging.color", true)?
        .set_default("scan.follow_symlinks", false)?
        .set_default("scan.ignore_patterns", vec![".git".to_string()])?
        .set_default("integrity.casing", true)?
        .set_default("integrity.placement", true)?;
    Ok(builder)
}

impl EngineSettings {
    /// Load settings for a project rooted at `project_dir`. `explicit` is the
    /// `--config` override; unlike the other file sources it must exist.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self, LoadError> {
        let mut builder = builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder);
        builder = sources::project_file::add_to_builder(builder, project_dir);
        if let Some(path) = explicit {
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }
        builder = sources::environment::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }
}
