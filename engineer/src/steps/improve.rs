//! Improvement of an existing workspace from prompts or scanner findings.

use anyhow::{Context, Result, anyhow};
use minijinja::context;
use serde_json::json;
use tracing::{debug, info};

use crate::core::files::{ALL_OUTPUT_KEY, overwrite_workspace, sanitize_key};
use crate::core::findings::{Finding, improvement_prompts};
use crate::core::stores::ProjectStores;
use crate::core::types::Message;
use crate::io::client::ModelClient;
use crate::io::prompt::{IMPROVE, render_preprompt};
use crate::steps::generate::PROMPT_KEY;
use crate::steps::{IMPROVE_EXISTING_CODE, reply_of, required_text, text_list};

pub const FILE_LIST_KEY: &str = "file_list";
pub const FINDINGS_KEY: &str = "findings";
pub const OVERWRITE_OUTPUT_KEY: &str = "all_output_overwrite.txt";

/// Decide which workspace files the model gets to see.
pub fn set_improve_filelist(
    _client: &mut dyn ModelClient,
    stores: &ProjectStores,
) -> Result<Vec<Message>> {
    let files = match stores.input.get(FILE_LIST_KEY) {
        Some(value) => text_list(&value).context("read input file_list")?,
        None => stores
            .workspace
            .keys()
            .into_iter()
            .filter(|key| key != ALL_OUTPUT_KEY)
            .collect(),
    };
    for file in &files {
        sanitize_key(file).map_err(|reason| anyhow!("file list: {reason}"))?;
        if !stores.workspace.contains(file) {
            return Err(anyhow!("file '{file}' is not in the workspace"));
        }
    }
    info!(files = files.len(), "improvement file list set");
    stores.input.set(FILE_LIST_KEY, json!(files));
    Ok(Vec::new())
}

/// Turn failed findings into fix prompts. Without findings, keep `input["prompt"]`.
pub fn get_improve_prompt(
    _client: &mut dyn ModelClient,
    stores: &ProjectStores,
) -> Result<Vec<Message>> {
    let Some(raw) = stores.input.get(FINDINGS_KEY) else {
        stores.input.get_required(PROMPT_KEY)?;
        debug!("no findings, keeping existing prompt");
        return Ok(Vec::new());
    };
    let findings: Vec<Finding> =
        serde_json::from_value(raw).context("parse input findings")?;
    let prompts = improvement_prompts(&findings);
    info!(
        findings = findings.len(),
        prompts = prompts.len(),
        "improvement prompts built"
    );
    stores.input.set(PROMPT_KEY, json!(prompts));
    Ok(Vec::new())
}

/// Send the listed files and requests; overwrite files named in the reply.
pub fn improve_existing_code(
    client: &mut dyn ModelClient,
    stores: &ProjectStores,
) -> Result<Vec<Message>> {
    let prompts = text_list(&stores.input.get_required(PROMPT_KEY)?).context("read prompt")?;
    if prompts.is_empty() {
        info!("nothing to improve");
        return Ok(Vec::new());
    }
    let files =
        text_list(&stores.input.get_required(FILE_LIST_KEY)?).context("read file_list")?;

    let mut messages = vec![Message::system(render_preprompt(
        &stores.preprompts,
        IMPROVE,
        context! {},
    )?)];
    for file in &files {
        let contents = required_text(&stores.workspace, file)?;
        messages.push(Message::user(format!("{file}\n```\n{contents}\n```\n")));
    }
    messages.extend(prompts.iter().map(|p| Message::user(format!("Request: {p}"))));

    let messages = client.request(messages, IMPROVE_EXISTING_CODE.name)?;
    let reply = reply_of(&messages)?;
    stores.memory.set(OVERWRITE_OUTPUT_KEY, reply);
    let changed = overwrite_workspace(&stores.workspace, reply);
    info!(files = changed.len(), "workspace files overwritten");
    Ok(messages)
}
