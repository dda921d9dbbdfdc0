//! CLI parse: clap types for strata. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// strata CLI - layered JSON configuration resolution
#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Resolve, validate, and inspect layered JSON configuration projects")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory (holds strata.json)
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Settings file path (overrides default settings loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and print the resolved tree
    Resolve {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write the resolved tree to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate the resolved tree against the project schema
    Validate {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run cross-layer integrity checks
    Check {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show provenance for one path: winner, history, origin file, value
    Explain {
        /// Canonical or relative path (e.g. $root/app/port or app/port)
        path: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Rewrite layer files in canonical formatting (diff-gated)
    Fmt {
        /// Only report which files would change; exit 1 if any would
        #[arg(long)]
        check: bool,
        /// Rewrite without prompting
        #[arg(long)]
        force: bool,
    },
}
