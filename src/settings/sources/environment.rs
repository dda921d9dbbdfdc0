//! Environment variable source: `STRATA__SECTION__FIELD`, e.g.
//! `STRATA__LOGGING__LEVEL=debug` or `STRATA__SCAN__FOLLOW_SYMLINKS=true`.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub const ENV_PREFIX: &str = "STRATA";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
