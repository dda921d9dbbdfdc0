//! Pipeline orchestration.
//!
//! `Engine` ties the stages together: load layers from disk, merge each
//! layer, cascade the layer trees over schema defaults, resolve references,
//! validate. Every stage accumulates its diagnostics in the result instead
//! of failing; the only hard errors are the `LoadError` cases (I/O, bad
//! manifest, case-colliding paths, settings, cancellation).
//!
//! The engine holds no pipeline state. Callers keep the last `RefreshResult`
//! they were handed; a cancelled refresh returns `Err(LoadError::Cancelled)`
//! without publishing anything, so the previous result stays current.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::cascade::{cascade, Provenance};
use crate::dom::{DomTree, NodeId};
use crate::error::LoadError;
use crate::integrity::{check_integrity, IntegrityReport};
use crate::layer::{load_layer, merge_layer, LayerDefinition, LayerIssue, LayerMergeResult, LoadedLayer};
use crate::progress::{CancelToken, NullSink, ProgressEvent, ProgressSink};
use crate::resolve::{resolve_refs, ResolveIssue};
use crate::schema::{schema_defaults, validate, SchemaNode, ValidationIssue};
use crate::settings::EngineSettings;

/// Output of one full pipeline run.
#[derive(Debug, Clone)]
pub struct RefreshResult {
    /// Per-layer merge results, in ascending priority order. The editor
    /// needs these for origin files; the CLI reports their issues.
    pub layers: Vec<LayerMergeResult>,
    /// Cascade output before reference resolution.
    pub merged: DomTree,
    /// Cascade output after reference resolution.
    pub resolved: DomTree,
    /// Winning origin and contributor history per path.
    pub provenance: Provenance,
    /// References left unresolved, with their classification.
    pub reference_errors: Vec<ResolveIssue>,
}

impl RefreshResult {
    /// All intra-layer issues, in layer order.
    pub fn layer_issues(&self) -> impl Iterator<Item = &LayerIssue> {
        self.layers.iter().flat_map(|layer| layer.issues.iter())
    }

    /// True when no layer issue and no reference error was recorded.
    pub fn is_clean(&self) -> bool {
        self.reference_errors.is_empty() && self.layer_issues().next().is_none()
    }
}

/// Stateless front door to the pipeline.
pub struct Engine {
    settings: EngineSettings,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Engine {
            settings,
            progress: Arc::new(NullSink),
            cancel: CancelToken::default(),
        }
    }

    /// Replace the progress sink. Events are coarse: per layer and per stage,
    /// per file only during scanning.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Token shared with this engine; cancelling it makes the next
    /// checkpoint in any running stage return `LoadError::Cancelled`.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Scan and parse one layer folder.
    pub fn load_layer(&self, definition: &LayerDefinition) -> Result<LoadedLayer, LoadError> {
        load_layer(
            definition,
            &self.settings.scan,
            self.progress.as_ref(),
            &self.cancel,
        )
    }

    /// Run merge → cascade → resolve over already-loaded layers.
    ///
    /// `schema` contributes the defaults pseudo-layer below every data
    /// layer. Layer order is priority order: later entries override earlier
    /// ones.
    #[instrument(skip_all, fields(layers = layers.len(), schema = schema.is_some()))]
    pub fn refresh(
        &self,
        schema: Option<&SchemaNode>,
        layers: &[LoadedLayer],
    ) -> Result<RefreshResult, LoadError> {
        let mut merged_layers = Vec::with_capacity(layers.len());
        for layer in layers {
            self.cancel.checkpoint()?;
            let result = merge_layer(layer);
            self.progress.report(ProgressEvent::LayerMerged {
                layer: result.layer.clone(),
                issues: result.issues.len(),
            });
            merged_layers.push(result);
        }
        self.refresh_merged(schema, merged_layers)
    }

    /// Cascade and resolve already-merged layer trees. The editor session
    /// uses this directly so in-memory edits survive the refresh.
    #[instrument(skip_all, fields(layers = layers.len()))]
    pub fn refresh_merged(
        &self,
        schema: Option<&SchemaNode>,
        layers: Vec<LayerMergeResult>,
    ) -> Result<RefreshResult, LoadError> {
        let started = Instant::now();

        self.cancel.checkpoint()?;
        let defaults = schema.map(schema_defaults);
        let trees: Vec<&DomTree> = layers.iter().map(|layer| &layer.merged).collect();
        let cascaded = cascade(defaults.as_ref(), &trees);
        self.progress.report(ProgressEvent::CascadeMerged {
            layers: trees.len(),
        });

        self.cancel.checkpoint()?;
        let resolution = resolve_refs(&cascaded.merged);
        self.progress.report(ProgressEvent::ReferencesResolved {
            resolved: resolution.replaced,
            unresolved: resolution.issues.len(),
        });

        info!(
            layers = layers.len(),
            references = resolution.replaced,
            unresolved = resolution.issues.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "refresh finished"
        );
        Ok(RefreshResult {
            layers,
            merged: cascaded.merged,
            resolved: resolution.tree,
            provenance: cascaded.provenance,
            reference_errors: resolution.issues,
        })
    }

    /// Look a canonical path up in any tree.
    pub fn query(&self, tree: &DomTree, path: &str) -> Option<NodeId> {
        tree.lookup(path)
    }

    /// Validate a tree against a schema; pure, issues in document order.
    pub fn validate(&self, tree: &DomTree, schema: &SchemaNode) -> Vec<ValidationIssue> {
        let issues = validate(tree, schema);
        self.progress.report(ProgressEvent::ValidationFinished {
            issues: issues.len(),
        });
        issues
    }

    /// Run the cross-layer advisory checks over raw layer data.
    pub fn check_integrity(
        &self,
        layers: &[LoadedLayer],
        schema: Option<&SchemaNode>,
    ) -> IntegrityReport {
        check_integrity(layers, schema, &self.settings.integrity)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineSettings::default())
    }
}
