//! strata CLI binary.
//!
//! Command-line front end for the layered configuration resolution engine.

use clap::Parser;
use std::process;
use strata::cli::{map_error, Cli, RunContext};
use strata::logging::{init_logging, LoggingConfig};
use strata::settings::EngineSettings;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(err) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", err);
        process::exit(1);
    }

    info!("strata CLI starting");

    let context = match RunContext::new(cli.project.clone(), cli.config.clone()) {
        Ok(context) => context,
        Err(err) => {
            error!("Error loading project: {}", err);
            eprintln!("{}", map_error(&err));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed");
            println!("{}", output.text);
            if output.failing {
                process::exit(1);
            }
        }
        Err(err) => {
            error!("Command failed: {}", err);
            eprintln!("{}", map_error(&err));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and settings.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    // Without --verbose the CLI stays quiet; diagnostics go through the
    // command output instead.
    if !cli.verbose {
        return LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        };
    }

    let mut config = EngineSettings::load(&cli.project, cli.config.as_deref())
        .map(|settings| settings.logging)
        .unwrap_or_default();

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    config
}
