//! Static-analysis findings turned into improvement prompts.
//!
//! Findings arrive in the scanner's JSON shape (one object per check). Only
//! the fields needed to build prompts are modelled; everything else is kept
//! opaque and ignored.

use serde::{Deserialize, Serialize};

/// Outcome of a single scanner check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub result: String,
}

/// One scanner finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub check_id: Option<String>,
    #[serde(default)]
    pub check_name: Option<String>,
    pub check_result: CheckResult,
    /// `(line number, source line)` pairs covered by the finding.
    #[serde(default)]
    pub code_block: Vec<(u64, String)>,
    #[serde(default)]
    pub file_path: Option<String>,
    /// Free-text explanation and fix instructions, one line per entry.
    #[serde(default)]
    pub details: Vec<String>,
}

impl Finding {
    pub fn failed(&self) -> bool {
        self.check_result.result == "FAILED"
    }

    /// Prompt asking the model to fix the lines this finding covers.
    pub fn fix_prompt(&self) -> String {
        let fix_instructions = self.details.join("\n");
        let code = self
            .code_block
            .iter()
            .map(|(_, line)| line.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Fix the code lines according to fix instructions: {fix_instructions}\n Code:\n{code}\n"
        )
    }
}

/// One prompt per failed finding, in input order.
pub fn improvement_prompts(findings: &[Finding]) -> Vec<String> {
    findings
        .iter()
        .filter(|f| f.failed())
        .map(Finding::fix_prompt)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finding(result: &str) -> Finding {
        serde_json::from_value(json!({
            "check_id": "CKV_GCP_62",
            "check_name": "Bucket should log access",
            "check_result": {"result": result, "evaluated_keys": ["logging"]},
            "code_block": [[1, "resource \"bucket\" \"site\" {\n"], [2, "}\n"]],
            "file_path": "/gcs.tf",
            "details": ["", "**How to fix it**.", "Add a logging block."],
            "severity": "INFO"
        }))
        .expect("finding")
    }

    #[test]
    fn only_failed_findings_become_prompts() {
        let prompts = improvement_prompts(&[finding("FAILED"), finding("PASSED")]);
        assert_eq!(prompts.len(), 1);
    }

    #[test]
    fn prompt_joins_details_and_code_lines() {
        let prompt = finding("FAILED").fix_prompt();
        assert_eq!(
            prompt,
            "Fix the code lines according to fix instructions: \n**How to fix it**.\nAdd a logging block.\n Code:\nresource \"bucket\" \"site\" {\n\n}\n\n"
        );
    }

    #[test]
    fn missing_optional_fields_default() {
        let f: Finding =
            serde_json::from_value(json!({"check_result": {"result": "FAILED"}})).expect("parse");
        assert!(f.failed());
        assert_eq!(
            f.fix_prompt(),
            "Fix the code lines according to fix instructions: \n Code:\n\n"
        );
    }
}
