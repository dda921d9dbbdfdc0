//! CLI route: single route table and run context. Dispatches to the engine
//! and presentation.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::cascade::ValueOrigin;
use crate::engine::{Engine, RefreshResult};
use crate::error::LoadError;
use crate::layer::{merge_layer, LoadedLayer};
use crate::project::Project;
use crate::schema::SchemaNode;
use crate::settings::EngineSettings;
use crate::writeback::{plan_layer_writes, FileWrite};

use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_explain_json, format_explain_text, format_integrity_json, format_integrity_text,
    format_resolve_json, format_validation_json, format_validation_text, format_writes_text,
};

/// What a command produced: the text to print and whether the process
/// should exit non-zero as front-end policy (error-severity validation
/// issues, pending `fmt --check` rewrites).
pub struct CommandOutput {
    pub text: String,
    pub failing: bool,
}

impl CommandOutput {
    fn ok(text: impl Into<String>) -> Self {
        CommandOutput {
            text: text.into(),
            failing: false,
        }
    }

    fn failing(text: impl Into<String>) -> Self {
        CommandOutput {
            text: text.into(),
            failing: true,
        }
    }
}

/// Provenance summary for one path, built by `explain`.
#[derive(Debug, Serialize)]
pub struct Explanation {
    pub path: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub history: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_file: Option<String>,
}

/// Runtime context for CLI execution: project manifest plus a configured
/// engine.
pub struct RunContext {
    project: Project,
    engine: Engine,
}

// `Engine` holds a `dyn ProgressSink` without a `Debug` bound, so the
// derive is unavailable.
impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Create a run context from the project root and an optional explicit
    /// settings file.
    pub fn new(project_dir: PathBuf, config: Option<PathBuf>) -> Result<Self, LoadError> {
        let settings = EngineSettings::load(&project_dir, config.as_deref())?;
        let project = Project::load(&project_dir)?;
        let engine = Engine::new(settings);
        Ok(RunContext { project, engine })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, LoadError> {
        match command {
            Commands::Resolve { format, output } => self.handle_resolve(*format, output.as_deref()),
            Commands::Validate { format } => self.handle_validate(*format),
            Commands::Check { format } => self.handle_check(*format),
            Commands::Explain { path, format } => self.handle_explain(path, *format),
            Commands::Fmt { check, force } => self.handle_fmt(*check, *force),
        }
    }

    fn load_layers(&self) -> Result<Vec<LoadedLayer>, LoadError> {
        self.project
            .layer_definitions()
            .iter()
            .map(|definition| self.engine.load_layer(definition))
            .collect()
    }

    fn run_pipeline(&self) -> Result<(Vec<LoadedLayer>, Option<SchemaNode>, RefreshResult), LoadError> {
        let layers = self.load_layers()?;
        let schema = self.project.load_schema()?;
        let result = self.engine.refresh(schema.as_ref(), &layers)?;
        Ok((layers, schema, result))
    }

    fn handle_resolve(
        &self,
        format: OutputFormat,
        output: Option<&std::path::Path>,
    ) -> Result<CommandOutput, LoadError> {
        let (_, _, result) = self.run_pipeline()?;
        let text = match format {
            OutputFormat::Text => {
                serde_json::to_string_pretty(&result.resolved.to_json(result.resolved.root()))
                    .expect("JSON value always renders")
            }
            OutputFormat::Json => format_resolve_json(&result),
        };
        match output {
            Some(path) => {
                fs::write(path, format!("{text}\n")).map_err(|source| LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(CommandOutput::ok(format!("Wrote {}", path.display())))
            }
            None => Ok(CommandOutput::ok(text)),
        }
    }

    fn handle_validate(&self, format: OutputFormat) -> Result<CommandOutput, LoadError> {
        let (_, schema, result) = self.run_pipeline()?;
        let issues = match &schema {
            Some(schema) => self.engine.validate(&result.resolved, schema),
            None => Vec::new(),
        };
        let failing = issues.iter().any(|issue| issue.is_error());
        let mut text = match format {
            OutputFormat::Text => format_validation_text(&result, &issues),
            OutputFormat::Json => format_validation_json(&result, &issues),
        };
        if schema.is_none() && format == OutputFormat::Text {
            text = format!("No schema sources configured.\n{text}");
        }
        if failing {
            Ok(CommandOutput::failing(text))
        } else {
            Ok(CommandOutput::ok(text))
        }
    }

    fn handle_check(&self, format: OutputFormat) -> Result<CommandOutput, LoadError> {
        let layers = self.load_layers()?;
        let schema = self.project.load_schema()?;
        let report = self.engine.check_integrity(&layers, schema.as_ref());
        let text = match format {
            OutputFormat::Text => format_integrity_text(&report),
            OutputFormat::Json => format_integrity_json(&report),
        };
        Ok(CommandOutput::ok(text))
    }

    fn handle_explain(&self, path: &str, format: OutputFormat) -> Result<CommandOutput, LoadError> {
        let (_, _, result) = self.run_pipeline()?;
        let explanation = explain(&result, path);
        let found = explanation.found;
        let text = match format {
            OutputFormat::Text => format_explain_text(&explanation),
            OutputFormat::Json => format_explain_json(&explanation),
        };
        if found {
            Ok(CommandOutput::ok(text))
        } else {
            Ok(CommandOutput::failing(text))
        }
    }

    fn handle_fmt(&self, check: bool, force: bool) -> Result<CommandOutput, LoadError> {
        let layers = self.load_layers()?;
        let mut rows: Vec<(String, String)> = Vec::new();
        let mut pending: Vec<FileWrite> = Vec::new();
        for layer in &layers {
            let merge = merge_layer(layer);
            for write in plan_layer_writes(layer, &merge) {
                if !write.changed {
                    continue;
                }
                rows.push((layer.definition.name.clone(), write.relative.clone()));
                pending.push(write);
            }
        }
        if pending.is_empty() {
            return Ok(CommandOutput::ok("All files already canonical."));
        }
        if check {
            return Ok(CommandOutput::failing(format!(
                "{}\n{} file(s) would be rewritten.",
                format_writes_text(&rows),
                pending.len()
            )));
        }
        if !force {
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Rewrite {} file(s) in canonical form?",
                    pending.len()
                ))
                .interact()
                .map_err(|err| {
                    LoadError::Settings(format!("failed to read confirmation: {err}"))
                })?;
            if !confirmed {
                return Ok(CommandOutput::ok("Cancelled."));
            }
        }
        for write in &pending {
            fs::write(&write.path, &write.text).map_err(|source| LoadError::Io {
                path: write.path.clone(),
                source,
            })?;
            debug!(file = %write.relative, "rewritten");
        }
        Ok(CommandOutput::ok(format!(
            "{}\n{} file(s) rewritten.",
            format_writes_text(&rows),
            pending.len()
        )))
    }
}

/// Build the provenance summary for one path against a committed result.
pub fn explain(result: &RefreshResult, path: &str) -> Explanation {
    let Some(id) = result.merged.lookup(path) else {
        return Explanation {
            path: path.to_string(),
            found: false,
            value: None,
            winner: None,
            history: Vec::new(),
            origin_file: None,
        };
    };
    let exact = result.merged.path(id);
    let winner = result.provenance.value_origins.get(&exact).copied();
    let history = result
        .provenance
        .override_sources
        .get(&exact)
        .map(|sources| {
            sources
                .iter()
                .map(|origin| origin_label(result, *origin))
                .collect()
        })
        .unwrap_or_default();
    let origin_file = winner.and_then(|origin| match origin {
        ValueOrigin::Layer(index) => result
            .layers
            .get(index)
            .and_then(|layer| layer.origins.get(&exact))
            .cloned(),
        ValueOrigin::Defaults => None,
    });
    let value = result
        .resolved
        .lookup(&exact)
        .map(|node| result.resolved.to_json(node));
    Explanation {
        path: exact,
        found: true,
        value,
        winner: winner.map(|origin| origin_label(result, origin)),
        history,
        origin_file,
    }
}

fn origin_label(result: &RefreshResult, origin: ValueOrigin) -> String {
    match origin {
        ValueOrigin::Defaults => "defaults".to_string(),
        ValueOrigin::Layer(index) => match result.layers.get(index) {
            Some(layer) => format!("{} (layer {})", layer.layer, index),
            None => format!("layer {index}"),
        },
    }
}
