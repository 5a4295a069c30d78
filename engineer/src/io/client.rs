//! Model client abstraction.
//!
//! The [`ModelClient`] trait decouples steps from the language-model backend.
//! [`CommandClient`] spawns a configured command per request; tests use
//! scripted clients that return canned replies without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::{debug, info, instrument, warn};

use crate::core::types::Message;
use crate::core::usage::UsageLedger;
use crate::io::config::ModelConfig;
use crate::io::process::run_command_with_timeout;

/// Capabilities the pipeline needs from a language-model backend.
pub trait ModelClient {
    /// Send `messages` and return them with the assistant reply appended.
    ///
    /// Usage is recorded against `step_name`.
    fn request(&mut self, messages: Vec<Message>, step_name: &str) -> Result<Vec<Message>>;

    /// Transcript encoding stored in the `logs` namespace.
    fn serialize_messages(&self, messages: &[Message]) -> Result<Value> {
        serialize_messages(messages)
    }

    /// Summary of resource consumption across the whole run.
    fn usage_summary(&self) -> Value;
}

/// JSON-string encoding of a transcript; reversed by [`deserialize_messages`].
pub fn serialize_messages(messages: &[Message]) -> Result<Value> {
    let encoded = serde_json::to_string(messages).context("serialize messages")?;
    Ok(Value::String(encoded))
}

pub fn deserialize_messages(value: &Value) -> Result<Vec<Message>> {
    let encoded = value
        .as_str()
        .ok_or_else(|| anyhow!("serialized transcript must be a string"))?;
    serde_json::from_str(encoded).context("parse serialized messages")
}

/// Request body written to the model command's stdin.
#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: &'a [Message],
}

/// Client that spawns `model.command` once per request.
pub struct CommandClient {
    config: ModelConfig,
    tokenizer: CoreBPE,
    ledger: UsageLedger,
}

impl CommandClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let tokenizer = cl100k_base().map_err(|err| anyhow!("load cl100k tokenizer: {err}"))?;
        Ok(Self {
            config,
            tokenizer,
            ledger: UsageLedger::new(),
        })
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    fn count_tokens(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| self.tokenizer.encode_with_special_tokens(&m.content).len())
            .sum()
    }
}

impl ModelClient for CommandClient {
    #[instrument(skip_all, fields(step = step_name, model = %self.config.name, messages = messages.len()))]
    fn request(&mut self, mut messages: Vec<Message>, step_name: &str) -> Result<Vec<Message>> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("model.command is empty"))?;
        let body = serde_json::to_vec(&CommandRequest {
            model: &self.config.name,
            temperature: self.config.temperature,
            messages: &messages,
        })
        .context("encode model request")?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        info!(program = %program, "requesting completion");

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output =
            run_command_with_timeout(cmd, Some(body), timeout, self.config.output_limit_bytes)
                .with_context(|| format!("run model command '{program}'"))?;

        if output.timed_out {
            warn!(timeout_secs = timeout.as_secs(), "model command timed out");
            return Err(anyhow!("model command timed out after {:?}", timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "model command failed");
            return Err(anyhow!(
                "model command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_lossy().trim()
            ));
        }
        if output.stdout_truncated > 0 {
            return Err(anyhow!(
                "model reply exceeded {} bytes",
                self.config.output_limit_bytes
            ));
        }

        let reply = output.stdout_lossy().trim_end().to_string();
        let prompt_tokens = self.count_tokens(&messages);
        messages.push(Message::assistant(reply));
        let completion_tokens = self.count_tokens(&messages[messages.len() - 1..]);
        self.ledger
            .record(step_name, prompt_tokens, completion_tokens);
        debug!(prompt_tokens, completion_tokens, "completion received");

        Ok(messages)
    }

    fn usage_summary(&self) -> Value {
        Value::String(self.ledger.to_csv())
    }
}
