//! Code generation steps: first draft, feedback revision and entrypoint.

use anyhow::{Result, anyhow};
use minijinja::context;
use tracing::info;

use crate::core::files::{ALL_OUTPUT_KEY, chat_to_workspace, code_blocks};
use crate::core::stores::ProjectStores;
use crate::core::types::Message;
use crate::io::client::ModelClient;
use crate::io::prompt::{ENTRYPOINT, GENERATE, render_preprompt};
use crate::steps::execute::RUN_SCRIPT_KEY;
use crate::steps::{GEN_ENTRYPOINT, SIMPLE_GEN, USE_FEEDBACK, reply_of, required_text};

pub const PROMPT_KEY: &str = "prompt";
pub const FEEDBACK_KEY: &str = "feedback";

/// Generate the codebase from `input["prompt"]`.
pub fn simple_gen(client: &mut dyn ModelClient, stores: &ProjectStores) -> Result<Vec<Message>> {
    let system = render_preprompt(&stores.preprompts, GENERATE, context! {})?;
    let prompt = required_text(&stores.input, PROMPT_KEY)?;

    let messages = client.request(
        vec![Message::system(system), Message::user(prompt)],
        SIMPLE_GEN.name,
    )?;
    store_generated(stores, reply_of(&messages)?);
    Ok(messages)
}

/// Regenerate the codebase from the previous output plus operator feedback.
pub fn use_feedback(client: &mut dyn ModelClient, stores: &ProjectStores) -> Result<Vec<Message>> {
    let system = render_preprompt(&stores.preprompts, GENERATE, context! {})?;
    let prompt = required_text(&stores.input, PROMPT_KEY)?;
    let previous = required_text(&stores.memory, ALL_OUTPUT_KEY)?;
    let feedback = required_text(&stores.input, FEEDBACK_KEY)?;

    let messages = client.request(
        vec![
            Message::system(system),
            Message::user(prompt),
            Message::assistant(previous),
            Message::user(feedback),
        ],
        USE_FEEDBACK.name,
    )?;
    store_generated(stores, reply_of(&messages)?);
    Ok(messages)
}

/// Ask for the shell commands that install and run the generated code.
pub fn gen_entrypoint(
    client: &mut dyn ModelClient,
    stores: &ProjectStores,
) -> Result<Vec<Message>> {
    let system = render_preprompt(&stores.preprompts, ENTRYPOINT, context! {})?;
    let all_output = required_text(&stores.workspace, ALL_OUTPUT_KEY)?;

    let messages = client.request(
        vec![
            Message::system(system),
            Message::user(format!("Information about the codebase:\n\n{all_output}")),
        ],
        GEN_ENTRYPOINT.name,
    )?;
    let blocks = code_blocks(reply_of(&messages)?);
    if blocks.is_empty() {
        return Err(anyhow!("entrypoint reply contained no code block"));
    }
    stores.workspace.set(RUN_SCRIPT_KEY, blocks.join("\n"));
    info!(blocks = blocks.len(), "entrypoint written");
    Ok(messages)
}

fn store_generated(stores: &ProjectStores, reply: &str) {
    stores.memory.set(ALL_OUTPUT_KEY, reply);
    let files = chat_to_workspace(&stores.workspace, reply);
    info!(files = files.len(), "generated files stored");
}
