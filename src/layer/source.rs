//! Layer directory scanning and file parsing.
//!
//! Scanning collects every `*.json` file under the layer folder, sorts the
//! list by relative path (byte-wise lexicographic; this ordering is the
//! determinism contract for everything downstream), and refuses to proceed
//! when two paths differ only by letter case, since file identity is then
//! ambiguous on case-preserving file systems.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::dom::{path, Fragment};
use crate::error::LoadError;
use crate::layer::{LayerDefinition, LayerIssue, LoadedLayer};
use crate::progress::{CancelToken, ProgressEvent, ProgressSink};
use crate::settings::ScanSettings;

/// One parsed configuration file. The original text and its digest stay
/// around so write-back can skip files whose rendered content is unchanged.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub absolute: PathBuf,
    /// Path relative to the layer folder, `/`-separated on every platform.
    pub relative: String,
    pub text: String,
    /// blake3 of `text`, hex-encoded.
    pub digest: String,
    pub root: Fragment,
    /// Case-duplicate keys dropped during parsing, as paths relative to the
    /// file root.
    pub duplicate_keys: Vec<String>,
}

impl SourceFile {
    /// Where this file's content lands in the layer tree: the relative path
    /// with the extension stripped, one segment per path component.
    pub fn mount_segments(&self) -> Vec<String> {
        mount_segments(&self.relative)
    }
}

/// Scan and parse one layer folder.
///
/// Unreadable or malformed files become [`LayerIssue::Parse`] entries and are
/// skipped; a missing folder or a case-colliding pair of paths aborts the
/// whole load.
#[instrument(skip_all, fields(layer = %definition.name, folder = %definition.folder.display()))]
pub fn load_layer(
    definition: &LayerDefinition,
    scan: &ScanSettings,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<LoadedLayer, LoadError> {
    if !definition.folder.is_dir() {
        return Err(LoadError::LayerFolderMissing(definition.folder.clone()));
    }
    progress.report(ProgressEvent::LayerScanStarted {
        layer: definition.name.clone(),
    });

    let listed = list_json_files(&definition.folder, scan)?;
    detect_case_collisions(&listed)?;
    progress.report(ProgressEvent::LayerScanFinished {
        layer: definition.name.clone(),
        files: listed.len(),
    });

    let mut files = Vec::with_capacity(listed.len());
    let mut issues = Vec::new();
    for (relative, absolute) in listed {
        cancel.checkpoint()?;
        let text = match fs::read_to_string(&absolute) {
            Ok(text) => text,
            Err(source) => {
                warn!(file = %relative, error = %source, "unreadable file skipped");
                issues.push(LayerIssue::Parse {
                    file: relative,
                    detail: source.to_string(),
                });
                continue;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(source) => {
                warn!(file = %relative, error = %source, "malformed JSON skipped");
                issues.push(LayerIssue::Parse {
                    file: relative,
                    detail: source.to_string(),
                });
                continue;
            }
        };
        let (root, duplicate_keys) = Fragment::from_json(&value);
        progress.report(ProgressEvent::FileParsed {
            layer: definition.name.clone(),
            file: relative.clone(),
        });
        let digest = hex::encode(blake3::hash(text.as_bytes()).as_bytes());
        files.push(SourceFile {
            absolute,
            relative,
            text,
            digest,
            root,
            duplicate_keys,
        });
    }

    debug!(files = files.len(), issues = issues.len(), "layer loaded");
    Ok(LoadedLayer {
        definition: definition.clone(),
        files,
        issues,
    })
}

/// Collect `(relative, absolute)` pairs for every JSON file, sorted by
/// relative path.
fn list_json_files(folder: &Path, scan: &ScanSettings) -> Result<Vec<(String, PathBuf)>, LoadError> {
    let ignored = build_ignore_set(&scan.ignore_patterns)?;
    let mut walker = WalkDir::new(folder).follow_links(scan.follow_symlinks);
    if let Some(depth) = scan.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut listed = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !ignored.is_match(Path::new(entry.file_name())))
    {
        let entry = entry.map_err(|source| LoadError::Io {
            path: folder.to_path_buf(),
            source: source.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_json = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !is_json {
            continue;
        }
        let relative = relative_slash_path(entry.path(), folder)?;
        listed.push((relative, entry.path().to_path_buf()));
    }
    listed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listed)
}

/// Ignore patterns match single path components, so `.git` prunes that
/// directory wherever it appears.
fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, LoadError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| {
            LoadError::Settings(format!("invalid ignore pattern {pattern:?}: {source}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|source| LoadError::Settings(format!("ignore patterns: {source}")))
}

fn relative_slash_path(file: &Path, folder: &Path) -> Result<String, LoadError> {
    let relative = file.strip_prefix(folder).map_err(|_| LoadError::Io {
        path: file.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, "file outside the layer folder"),
    })?;
    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Two relative paths that fold to the same string name the same file on a
/// case-insensitive file system; refuse the layer outright.
fn detect_case_collisions(listed: &[(String, PathBuf)]) -> Result<(), LoadError> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(listed.len());
    for (relative, _) in listed {
        let folded = path::fold_key(relative);
        if let Some(first) = seen.insert(folded, relative) {
            return Err(LoadError::CaseCollision {
                first: first.to_string(),
                second: relative.clone(),
            });
        }
    }
    Ok(())
}

fn mount_segments(relative: &str) -> Vec<String> {
    let mut segments: Vec<String> = relative.split('/').map(str::to_string).collect();
    if let Some(last) = segments.last_mut() {
        if let Some(stem) = Path::new(last.as_str()).file_stem() {
            *last = stem.to_string_lossy().into_owned();
        }
    }
    segments
}
