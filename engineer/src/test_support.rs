//! Test-only helpers: scripted collaborators and store builders.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde_json::Value;
use tempfile::TempDir;

use crate::core::store::RootStore;
use crate::core::stores::{Layout, ProjectStores};
use crate::core::types::Message;
use crate::core::usage::UsageLedger;
use crate::io::client::{ModelClient, serialize_messages};
use crate::io::operator::Operator;
use crate::io::prompt::seed_preprompts;
use crate::steps::execute::{EXECUTE_APPROVED_KEY, WORKSPACE_PATH_KEY};

/// Model client that replies from a fixed script and records every call.
///
/// [`ScriptedClient::events`] lists `request:<step>`, `serialize:<first
/// message>` and `usage` in call order, so tests can check how the runner
/// drives the client.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: VecDeque<String>,
    pub requests: Vec<(String, Vec<Message>)>,
    events: RefCell<Vec<String>>,
    ledger: UsageLedger,
}

impl ScriptedClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A client with no replies; any request fails.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.len()
    }
}

impl ModelClient for ScriptedClient {
    fn request(&mut self, mut messages: Vec<Message>, step_name: &str) -> Result<Vec<Message>> {
        self.events.borrow_mut().push(format!("request:{step_name}"));
        self.requests.push((step_name.to_string(), messages.clone()));
        let reply = self
            .replies
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted reply left for step '{step_name}'"))?;
        // Whitespace-separated words stand in for tokens.
        let prompt_words = messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum();
        self.ledger
            .record(step_name, prompt_words, reply.split_whitespace().count());
        messages.push(Message::assistant(reply));
        Ok(messages)
    }

    fn serialize_messages(&self, messages: &[Message]) -> Result<Value> {
        let first = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        self.events.borrow_mut().push(format!("serialize:{first}"));
        serialize_messages(messages)
    }

    fn usage_summary(&self) -> Value {
        self.events.borrow_mut().push("usage".to_string());
        Value::String(self.ledger.to_csv())
    }
}

/// Operator that answers from a fixed script and records the questions.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for '{question}'"))
    }
}

/// Standard-layout stores over a fresh root, with built-in preprompts seeded.
pub fn project_stores() -> ProjectStores {
    let stores = ProjectStores::open(&RootStore::new(), Layout::Standard);
    seed_preprompts(&stores.preprompts);
    stores
}

/// Stores whose workspace materializes into a temporary directory, with
/// entrypoint execution approved.
pub struct TempProject {
    pub dir: TempDir,
    pub stores: ProjectStores,
}

impl TempProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let stores = project_stores();
        let workspace = dir.path().join("workspace");
        stores
            .project_metadata
            .set(WORKSPACE_PATH_KEY, workspace.to_string_lossy().into_owned());
        stores.project_metadata.set(EXECUTE_APPROVED_KEY, true);
        Self { dir, stores }
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.dir.path().join("workspace")
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}
