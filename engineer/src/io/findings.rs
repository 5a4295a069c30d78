//! Loading static-analysis findings from a scanner report on disk.
//!
//! Accepts either a bare array of findings or a report object with
//! `results.failed_checks` / `results.passed_checks`. Reports are validated
//! against `schemas/findings.schema.json` before they are parsed.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::findings::Finding;

const FINDINGS_SCHEMA: &str = include_str!("../../schemas/findings.schema.json");

/// Read, validate and flatten a findings report.
pub fn load_findings(path: &Path) -> Result<Vec<Finding>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read findings {}", path.display()))?;
    let report: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse findings {}", path.display()))?;
    parse_findings(report).with_context(|| format!("load findings {}", path.display()))
}

/// Validate and flatten an already-parsed report.
pub fn parse_findings(report: Value) -> Result<Vec<Finding>> {
    validate_report(&report)?;
    let items = match report {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            let mut results = obj.remove("results").unwrap_or(Value::Null);
            let mut items = Vec::new();
            for section in ["failed_checks", "passed_checks"] {
                if let Some(Value::Array(list)) = results.get_mut(section).map(Value::take) {
                    items.extend(list);
                }
            }
            items
        }
        _ => return Err(anyhow!("findings report must be an array or object")),
    };
    let findings = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Finding>, _>>()
        .context("deserialize findings")?;
    debug!(count = findings.len(), "findings loaded");
    Ok(findings)
}

fn validate_report(report: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(FINDINGS_SCHEMA).context("parse findings schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(report) {
        let messages = compiled
            .iter_errors(report)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "findings schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
