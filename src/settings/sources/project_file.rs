//! Per-project settings file, `strata.toml` next to the project manifest.

use std::path::Path;

use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};

pub const FILE_NAME: &str = "strata.toml";

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_dir: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        File::from(project_dir.join(FILE_NAME))
            .format(FileFormat::Toml)
            .required(false),
    )
}
