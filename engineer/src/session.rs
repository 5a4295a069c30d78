//! Per-invocation setup that happens before any step runs.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::archive::archive;
use crate::core::mode::StepMode;
use crate::core::stores::ProjectStores;
use crate::io::operator::Operator;
use crate::steps::execute::EXECUTE_APPROVED_KEY;
use crate::steps::generate::PROMPT_KEY;
use crate::steps::{EXECUTE_ENTRYPOINT, Step};

pub const PROMPT_QUESTION: &str = "\nWhat application do you want to generate?";
pub const EXECUTE_QUESTION: &str =
    "\nDo you want to execute the generated entrypoint (run.sh) when it is ready? [y/N]";

/// What [`start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStart {
    pub archived: bool,
    pub prompted: bool,
}

/// Archive previous output and make sure a prompt exists, for fresh modes.
///
/// Non-fresh modes reuse the existing artifacts and leave the stores alone.
pub fn start(
    stores: &ProjectStores,
    mode: StepMode,
    operator: &mut dyn Operator,
) -> Result<SessionStart> {
    if !mode.is_fresh() {
        debug!(mode = %mode, "resuming, no archive");
        return Ok(SessionStart::default());
    }

    archive(stores);
    let mut started = SessionStart {
        archived: true,
        prompted: false,
    };

    if !stores.input.get(PROMPT_KEY).is_some_and(|v| is_present(&v)) {
        let answer = operator.ask(PROMPT_QUESTION)?;
        stores.input.set(PROMPT_KEY, answer);
        started.prompted = true;
    }
    Ok(started)
}

/// Record whether `run.sh` may be executed, asking only when a step needs it.
///
/// Returns `None` when none of `steps` executes code.
pub fn approve_execution(
    stores: &ProjectStores,
    steps: &[Step],
    operator: &mut dyn Operator,
    assume_yes: bool,
) -> Result<Option<bool>> {
    if !steps.iter().any(|s| s.name == EXECUTE_ENTRYPOINT.name) {
        return Ok(None);
    }
    let approved = assume_yes || is_yes(&operator.ask(EXECUTE_QUESTION)?);
    info!(approved, "entrypoint execution decision");
    stores.project_metadata.set(EXECUTE_APPROVED_KEY, approved);
    Ok(Some(approved))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archive::archive_key;
    use crate::steps::steps_for;
    use crate::test_support::{ScriptedOperator, project_stores};
    use serde_json::json;

    #[test]
    fn fresh_mode_archives_and_prompts_when_prompt_missing() {
        let stores = project_stores();
        stores.workspace.set("main.py", "print(1)");
        let mut operator = ScriptedOperator::new(["a snake game"]);

        let started = start(&stores, StepMode::Default, &mut operator).expect("start");

        assert_eq!(
            started,
            SessionStart {
                archived: true,
                prompted: true
            }
        );
        assert_eq!(operator.questions, vec![PROMPT_QUESTION]);
        assert_eq!(stores.input.get(PROMPT_KEY), Some(json!("a snake game")));
        let keys = stores.archive.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].len(), archive_key(chrono::Local::now().naive_local()).len());
    }

    #[test]
    fn existing_prompt_is_not_asked_again() {
        let stores = project_stores();
        stores.input.set(PROMPT_KEY, "a todo app");
        let mut operator = ScriptedOperator::default();

        let started = start(&stores, StepMode::ImproveCode, &mut operator).expect("start");

        assert!(started.archived);
        assert!(!started.prompted);
        assert!(operator.questions.is_empty());
    }

    #[test]
    fn empty_prompt_counts_as_missing() {
        let stores = project_stores();
        stores.input.set(PROMPT_KEY, "");
        let mut operator = ScriptedOperator::new(["a clock"]);

        start(&stores, StepMode::Default, &mut operator).expect("start");

        assert_eq!(stores.input.get(PROMPT_KEY), Some(json!("a clock")));
    }

    #[test]
    fn resuming_modes_neither_archive_nor_prompt() {
        for mode in [StepMode::ExecuteOnly, StepMode::UseFeedback, StepMode::Evaluate] {
            let stores = project_stores();
            let mut operator = ScriptedOperator::default();

            let started = start(&stores, mode, &mut operator).expect("start");

            assert_eq!(started, SessionStart::default());
            assert!(stores.archive.keys().is_empty());
            assert!(operator.questions.is_empty());
        }
    }

    #[test]
    fn closed_operator_input_fails_start() {
        let stores = project_stores();
        let mut operator = ScriptedOperator::default();
        assert!(start(&stores, StepMode::Default, &mut operator).is_err());
    }

    #[test]
    fn execution_approval_only_asked_when_needed() {
        let stores = project_stores();
        let mut operator = ScriptedOperator::new(["Y"]);

        let none = approve_execution(&stores, steps_for(StepMode::ImproveCode), &mut operator, false)
            .expect("approve");
        assert_eq!(none, None);
        assert!(operator.questions.is_empty());

        let asked = approve_execution(&stores, steps_for(StepMode::Default), &mut operator, false)
            .expect("approve");
        assert_eq!(asked, Some(true));
        assert_eq!(stores.project_metadata.get(EXECUTE_APPROVED_KEY), Some(json!(true)));

        let mut silent = ScriptedOperator::default();
        let assumed = approve_execution(&stores, steps_for(StepMode::Evaluate), &mut silent, true)
            .expect("approve");
        assert_eq!(assumed, Some(true));
        assert!(silent.questions.is_empty());
    }
}
