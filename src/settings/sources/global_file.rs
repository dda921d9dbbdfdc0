//! Global per-user settings file.
//!
//! Lives at the platform config directory (`~/.config/strata/config.toml` on
//! Linux). `STRATA_CONFIG_DIR` overrides the directory outright, which is
//! also the seam tests use to stay off the real home directory.

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use directories::ProjectDirs;

pub const CONFIG_DIR_ENV_VAR: &str = "STRATA_CONFIG_DIR";
const FILE_NAME: &str = "config.toml";

fn global_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV_VAR) {
        return Some(PathBuf::from(dir).join(FILE_NAME));
    }
    ProjectDirs::from("", "", "strata").map(|dirs| dirs.config_dir().join(FILE_NAME))
}

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) => builder.add_source(
            File::from(path)
                .format(FileFormat::Toml)
                .required(false),
        ),
        None => builder,
    }
}
