//! Named pipeline steps and the fixed mode → step-list mapping.
//!
//! A step is a plain function over the model client and the project stores.
//! Steps communicate only through the stores; the runner in
//! [`crate::pipeline`] takes care of recording transcripts.

use std::fmt;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::core::error::ConfigError;
use crate::core::mode::StepMode;
use crate::core::store::NamespacedStore;
use crate::core::stores::ProjectStores;
use crate::core::types::{Message, last_reply};
use crate::io::client::ModelClient;

pub mod evaluate;
pub mod execute;
pub mod generate;
pub mod improve;

pub type StepFn = fn(&mut dyn ModelClient, &ProjectStores) -> Result<Vec<Message>>;

/// A named unit of work. The name doubles as its key in the `logs` namespace.
#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub run: StepFn,
}

impl Step {
    pub const fn new(name: &'static str, run: StepFn) -> Self {
        Self { name, run }
    }

    pub fn call(
        &self,
        client: &mut dyn ModelClient,
        stores: &ProjectStores,
    ) -> Result<Vec<Message>> {
        (self.run)(client, stores)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Step").field(&self.name).finish()
    }
}

pub const SIMPLE_GEN: Step = Step::new("simple_gen", generate::simple_gen);
pub const GEN_ENTRYPOINT: Step = Step::new("gen_entrypoint", generate::gen_entrypoint);
pub const USE_FEEDBACK: Step = Step::new("use_feedback", generate::use_feedback);
pub const EXECUTE_ENTRYPOINT: Step = Step::new("execute_entrypoint", execute::execute_entrypoint);
pub const COLLECT_REVIEW: Step = Step::new("collect_review", evaluate::collect_review);
pub const SET_IMPROVE_FILELIST: Step =
    Step::new("set_improve_filelist", improve::set_improve_filelist);
pub const GET_IMPROVE_PROMPT: Step = Step::new("get_improve_prompt", improve::get_improve_prompt);
pub const IMPROVE_EXISTING_CODE: Step =
    Step::new("improve_existing_code", improve::improve_existing_code);

static DEFAULT_STEPS: [Step; 3] = [SIMPLE_GEN, GEN_ENTRYPOINT, EXECUTE_ENTRYPOINT];
static IMPROVE_STEPS: [Step; 3] = [SET_IMPROVE_FILELIST, GET_IMPROVE_PROMPT, IMPROVE_EXISTING_CODE];
static EXECUTE_ONLY_STEPS: [Step; 1] = [EXECUTE_ENTRYPOINT];
static USE_FEEDBACK_STEPS: [Step; 3] = [USE_FEEDBACK, GEN_ENTRYPOINT, EXECUTE_ENTRYPOINT];
static EVALUATE_STEPS: [Step; 2] = [EXECUTE_ENTRYPOINT, COLLECT_REVIEW];

/// The fixed, ordered step list for `mode`.
pub fn steps_for(mode: StepMode) -> &'static [Step] {
    match mode {
        StepMode::Default => &DEFAULT_STEPS,
        StepMode::ImproveCode => &IMPROVE_STEPS,
        StepMode::ExecuteOnly => &EXECUTE_ONLY_STEPS,
        StepMode::UseFeedback => &USE_FEEDBACK_STEPS,
        StepMode::Evaluate => &EVALUATE_STEPS,
    }
}

/// Resolve a mode name straight to its steps. Unknown names never yield steps.
pub fn steps_for_name(name: &str) -> Result<&'static [Step], ConfigError> {
    Ok(steps_for(name.parse()?))
}

/// Read `key` from `store`, requiring a string value.
pub(crate) fn required_text(store: &NamespacedStore, key: &str) -> Result<String> {
    match store.get_required(key)? {
        Value::String(text) => Ok(text),
        _ => Err(anyhow!("'{key}' in '{}' must be text", store.identifier())),
    }
}

/// A single string or an array of strings, as a list.
pub(crate) fn text_list(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(text) => Ok(vec![text.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("expected a list of strings, found {item}"))
            })
            .collect(),
        other => Err(anyhow!("expected text or a list of text, found {other}")),
    }
}

/// The assistant reply a client appended, or an error if it appended none.
pub(crate) fn reply_of(messages: &[Message]) -> Result<&str> {
    last_reply(messages).ok_or_else(|| anyhow!("model returned no assistant reply"))
}
