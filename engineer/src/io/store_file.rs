//! Persistence of the root store between invocations (`.engineer/store.json`).
//!
//! The in-memory store has no durable format of its own; this module is the
//! collaborator that seeds a session from disk and writes it back afterwards.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::core::store::RootStore;

/// Load a root store from disk, or an empty one if the file is missing.
pub fn load_root(path: &Path) -> Result<RootStore> {
    if !path.exists() {
        debug!(path = %path.display(), "no persisted store, starting empty");
        return Ok(RootStore::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read store {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse store {}", path.display()))?;
    let root =
        RootStore::from_value(value).with_context(|| format!("load store {}", path.display()))?;
    debug!(path = %path.display(), namespaces = root.identifiers().len(), "store loaded");
    Ok(root)
}

/// Atomically write the whole root store as pretty JSON.
pub fn write_root(path: &Path, root: &RootStore) -> Result<()> {
    debug!(path = %path.display(), "writing store");
    let mut buf = serde_json::to_string_pretty(&root.snapshot()).context("serialize store")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_yields_empty_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = load_root(&temp.path().join("store.json")).expect("load");
        assert!(root.identifiers().is_empty());
    }

    #[test]
    fn write_then_load_preserves_namespaces() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".engineer/store.json");
        let root = RootStore::new();
        root.namespace("workspace").set("main.py", "print(1)");
        root.namespace("logs").set("token_usage", json!("csv"));

        write_root(&path, &root).expect("write");
        let loaded = load_root(&path).expect("load");

        assert_eq!(loaded.snapshot(), root.snapshot());
    }

    #[test]
    fn deterministic_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("store.json");
        let root = RootStore::new();
        root.namespace("memory").set("k", "v");

        write_root(&path, &root).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "{\n  \"memory\": {\n    \"k\": \"v\"\n  }\n}\n");
    }

    #[test]
    fn malformed_store_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("store.json");
        fs::write(&path, "[1, 2]").expect("write");
        assert!(load_root(&path).is_err());
    }
}
