//! Preprompt templates: built-in defaults and rendering.
//!
//! Defaults are seeded into the `preprompts` namespace only where a key is
//! missing, so a project can carry its own wording. Templates are rendered
//! with minijinja; `philosophy` is always available to them.

use anyhow::{Context, Result, anyhow};
use minijinja::{Environment, Value as TemplateValue, context};
use serde_json::Value;
use tracing::debug;

use crate::core::store::NamespacedStore;

pub const GENERATE: &str = "generate";
pub const PHILOSOPHY: &str = "philosophy";
pub const ENTRYPOINT: &str = "entrypoint";
pub const IMPROVE: &str = "improve";

const DEFAULT_PREPROMPTS: [(&str, &str); 4] = [
    (GENERATE, include_str!("../preprompts/generate.md")),
    (PHILOSOPHY, include_str!("../preprompts/philosophy.md")),
    (ENTRYPOINT, include_str!("../preprompts/entrypoint.md")),
    (IMPROVE, include_str!("../preprompts/improve.md")),
];

/// Fill in missing built-in preprompts. Returns the keys that were added.
pub fn seed_preprompts(preprompts: &NamespacedStore) -> Vec<&'static str> {
    let mut added = Vec::new();
    for (name, body) in DEFAULT_PREPROMPTS {
        if !preprompts.contains(name) {
            preprompts.set(name, body);
            added.push(name);
        }
    }
    debug!(added = ?added, "preprompts seeded");
    added
}

/// Render the preprompt `name` from the store.
///
/// The template sees `philosophy` plus any fields of `extra`.
pub fn render_preprompt(
    preprompts: &NamespacedStore,
    name: &str,
    extra: TemplateValue,
) -> Result<String> {
    let template = text_of(preprompts, name)?;
    let philosophy = preprompts
        .get(PHILOSOPHY)
        .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
        .filter(|s| !s.is_empty());

    let env = Environment::new();
    let ctx = context! { philosophy => philosophy, ..extra };
    let rendered = env
        .render_str(&template, ctx)
        .with_context(|| format!("render preprompt '{name}'"))?;
    Ok(rendered.trim().to_string())
}

fn text_of(preprompts: &NamespacedStore, name: &str) -> Result<String> {
    match preprompts.get_required(name)? {
        Value::String(text) => Ok(text),
        other => Err(anyhow!(
            "preprompt '{name}' must be text, found {}",
            kind_of(&other)
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
