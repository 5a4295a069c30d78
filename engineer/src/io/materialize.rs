//! Writing the `workspace` namespace out as real files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::files::sanitize_key;
use crate::core::store::NamespacedStore;

/// Write every string-valued, safely named workspace entry under `dir`.
///
/// Entries with unsafe keys or non-string values are skipped with a warning.
/// Returns the paths written, in key order.
pub fn materialize_workspace(workspace: &NamespacedStore, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create workspace dir {}", dir.display()))?;
    let mut written = Vec::new();
    for (key, value) in workspace.snapshot() {
        let key = match sanitize_key(&key) {
            Ok(key) => key.to_string(),
            Err(reason) => {
                warn!(%reason, "skipping workspace entry");
                continue;
            }
        };
        let Value::String(contents) = value else {
            warn!(key = %key, "skipping non-text workspace entry");
            continue;
        };
        let path = dir.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    debug!(dir = %dir.display(), files = written.len(), "workspace materialized");
    Ok(written)
}
