//! Structured logging setup.
//!
//! Configuration comes from [`crate::settings::EngineSettings`]; the
//! `STRATA_LOG` environment variable overrides the configured level with a
//! full `tracing_subscriber::EnvFilter` directive string.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

use crate::error::LoadError;

/// Environment variable consulted before the configured level.
pub const LOG_ENV_VAR: &str = "STRATA_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level directive: `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_level")]
    pub level: String,
    /// `text` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
    /// `stdout` or `file`.
    #[serde(default = "default_output")]
    pub output: String,
    /// Log file path, used when `output` is `file`.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub color: bool,
    /// Per-module level overrides, e.g. `strata::resolve = "trace"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Install the global subscriber. Safe to call once per process; a second
/// call reports the collision as a settings error.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), LoadError> {
    let fallback = LoggingConfig::default();
    let config = config.unwrap_or(&fallback);

    let mut filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|source| LoadError::Settings(format!("invalid log level: {source}")))?;
    for (module, level) in &config.modules {
        let directive = format!("{module}={level}").parse().map_err(|source| {
            LoadError::Settings(format!("invalid log directive for {module}: {source}"))
        })?;
        filter = filter.add_directive(directive);
    }

    let timer = ChronoUtc::rfc_3339();
    let json = config.format.eq_ignore_ascii_case("json");
    let to_file = config.output.eq_ignore_ascii_case("file");

    if to_file {
        let path = config
            .file
            .clone()
            .ok_or_else(|| LoadError::Settings("log output is file but no file set".into()))?;
        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoadError::Settings(format!("cannot open log file: {source}")))?;
        let writer = Mutex::new(handle);
        if json {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_ansi(false)
                .with_writer(writer)
                .json()
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
        }
    } else if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(timer)
            .with_ansi(false)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(timer)
            .with_ansi(config.color)
            .try_init()
    }
    .map_err(|source| LoadError::Settings(format!("logging init failed: {source}")))
}
