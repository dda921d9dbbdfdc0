//! CLI presentation: text and json formatters per command family.
//!
//! Formatters are pure string builders; the route table decides what runs
//! and what exit status the process ends with.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

use crate::engine::RefreshResult;
use crate::integrity::{IntegrityReport, IntegrityWarning};
use crate::layer::LayerIssue;
use crate::schema::{Severity, ValidationIssue};

use super::route::Explanation;

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).expect("JSON value always renders")
}

pub fn format_resolve_json(result: &RefreshResult) -> String {
    let layer_issues: Vec<&LayerIssue> = result.layer_issues().collect();
    pretty(&json!({
        "resolved": result.resolved.to_json(result.resolved.root()),
        "layerIssues": layer_issues,
        "referenceErrors": result.reference_errors,
    }))
}

pub fn format_validation_json(result: &RefreshResult, issues: &[ValidationIssue]) -> String {
    let layer_issues: Vec<&LayerIssue> = result.layer_issues().collect();
    pretty(&json!({
        "layerIssues": layer_issues,
        "referenceErrors": result.reference_errors,
        "validationIssues": issues,
    }))
}

pub fn format_validation_text(result: &RefreshResult, issues: &[ValidationIssue]) -> String {
    let layer_issues: Vec<&LayerIssue> = result.layer_issues().collect();
    if layer_issues.is_empty() && result.reference_errors.is_empty() && issues.is_empty() {
        return "Validation passed: no issues.".to_string();
    }

    let mut out = String::new();
    if !layer_issues.is_empty() {
        out.push_str(&format!("Layer issues ({}):\n", layer_issues.len()));
        for issue in &layer_issues {
            out.push_str(&format!("  - {}\n", issue));
        }
        out.push('\n');
    }
    if !result.reference_errors.is_empty() {
        out.push_str(&format!(
            "Reference errors ({}):\n",
            result.reference_errors.len()
        ));
        for error in &result.reference_errors {
            out.push_str(&format!("  - {}\n", error));
        }
        out.push('\n');
    }
    if !issues.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Severity", "Path", "Rule", "Message"]);
        for issue in issues {
            table.add_row(vec![
                colored_severity(issue.severity),
                issue.path.clone(),
                issue.rule.to_string(),
                issue.message.clone(),
            ]);
        }
        out.push_str(&table.to_string());
        out.push('\n');
    }
    let errors = issues.iter().filter(|issue| issue.is_error()).count();
    out.push_str(&format!(
        "{} validation issue(s), {} error(s).",
        issues.len(),
        errors
    ));
    out
}

fn colored_severity(severity: Severity) -> String {
    match severity {
        Severity::Error => severity.to_string().red().to_string(),
        Severity::Warning => severity.to_string().yellow().to_string(),
        Severity::Info => severity.to_string().cyan().to_string(),
    }
}

pub fn format_integrity_json(report: &IntegrityReport) -> String {
    pretty(&serde_json::to_value(report).expect("JSON value always renders"))
}

pub fn format_integrity_text(report: &IntegrityReport) -> String {
    if report.is_clean() {
        return "Integrity checks passed: no warnings.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Check", "Detail"]);
    for warning in &report.warnings {
        table.add_row(vec![check_name(warning).to_string(), warning.to_string()]);
    }
    format!(
        "{}\n{} integrity warning(s).",
        table,
        report.warnings.len()
    )
}

fn check_name(warning: &IntegrityWarning) -> &'static str {
    match warning {
        IntegrityWarning::TrueOverlap { .. } => "true-overlap",
        IntegrityWarning::Placement { .. } => "placement",
        IntegrityWarning::Casing { .. } => "casing",
        IntegrityWarning::SchemaCasing { .. } => "schema-casing",
    }
}

pub fn format_explain_json(explanation: &Explanation) -> String {
    pretty(&serde_json::to_value(explanation).expect("JSON value always renders"))
}

pub fn format_explain_text(explanation: &Explanation) -> String {
    if !explanation.found {
        return format!("No value at {}", explanation.path);
    }
    let mut out = format!("Path: {}\n", explanation.path);
    if let Some(value) = &explanation.value {
        out.push_str(&format!("Resolved value: {}\n", value));
    }
    match &explanation.winner {
        Some(winner) => out.push_str(&format!("Defined by: {}\n", winner)),
        None => out.push_str("Defined by: (container)\n"),
    }
    if let Some(file) = &explanation.origin_file {
        out.push_str(&format!("Origin file: {}\n", file));
    }
    if !explanation.history.is_empty() {
        out.push_str("Contributors, lowest first:\n");
        for entry in &explanation.history {
            out.push_str(&format!("  - {}\n", entry));
        }
    }
    out.trim_end().to_string()
}

pub fn format_writes_text(rows: &[(String, String)]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Layer", "File"]);
    for (layer, file) in rows {
        table.add_row(vec![layer.clone(), file.clone()]);
    }
    table.to_string()
}
