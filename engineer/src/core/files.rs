//! Extraction of fenced code blocks from model replies into workspace files.
//!
//! Workspace keys become relative file paths when a project is materialized,
//! so every key written here passes [`sanitize_key`] first.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::core::store::NamespacedStore;

/// Key holding the full reply that produced the workspace files.
pub const ALL_OUTPUT_KEY: &str = "all_output.txt";

static FILE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(\S+)\n\s*```[^\n]*\n(.+?)```").expect("file block regex should be valid")
});
static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```\S*\n(.+?)```").expect("code block regex should be valid")
});
static PATH_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[:<>"|?*]"#).expect("path noise regex should be valid"));

/// Parse `(path, code)` pairs: a path line directly followed by a fenced block.
pub fn parse_chat(chat: &str) -> Vec<(String, String)> {
    FILE_BLOCK_RE
        .captures_iter(chat)
        .filter_map(|caps| {
            let path = clean_path(caps.get(1)?.as_str());
            let code = caps.get(2)?.as_str().to_string();
            if path.is_empty() {
                return None;
            }
            Some((path, code))
        })
        .collect()
}

/// Bodies of every fenced block, in order, ignoring any file names.
pub fn code_blocks(text: &str) -> Vec<String> {
    CODE_BLOCK_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn clean_path(raw: &str) -> String {
    let mut path = PATH_NOISE_RE.replace_all(raw, "").to_string();
    path = path.trim_matches('*').to_string();
    path = path.trim_start_matches('#').to_string();
    if let Some(inner) = path.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
        path = inner.to_string();
    }
    if let Some(inner) = path.strip_prefix('`').and_then(|p| p.strip_suffix('`')) {
        path = inner.to_string();
    }
    path.trim_end_matches(']').trim().to_string()
}

/// Check that a key is a plain relative path with no traversal.
pub fn sanitize_key(key: &str) -> Result<&str, String> {
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    if key.contains('\0') {
        return Err(format!("key '{}' contains a NUL byte", key.escape_debug()));
    }
    let path = Path::new(key);
    let mut names_file = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => names_file = true,
            Component::CurDir => {}
            Component::ParentDir => return Err(format!("key '{key}' escapes the workspace")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("key '{key}' is an absolute path"));
            }
        }
    }
    if !names_file {
        return Err(format!("key '{key}' names no file"));
    }
    Ok(key)
}

/// Store the full reply and every safe file block into `workspace`.
///
/// Returns the keys written (excluding the full-reply key), in reply order.
pub fn chat_to_workspace(workspace: &NamespacedStore, chat: &str) -> Vec<String> {
    workspace.set(ALL_OUTPUT_KEY, chat);
    write_blocks(workspace, chat)
}

/// Overwrite workspace files from a reply without touching the full-reply key.
pub fn overwrite_workspace(workspace: &NamespacedStore, chat: &str) -> Vec<String> {
    write_blocks(workspace, chat)
}

fn write_blocks(workspace: &NamespacedStore, chat: &str) -> Vec<String> {
    let mut written = Vec::new();
    for (path, code) in parse_chat(chat) {
        match sanitize_key(&path) {
            Ok(key) => {
                workspace.set(key, code);
                written.push(path);
            }
            Err(reason) => warn!(%reason, "skipping unsafe file from model reply"),
        }
    }
    debug!(files = written.len(), "wrote files from reply");
    written
}
