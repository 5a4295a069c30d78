//! Timestamped, non-destructive snapshots of `memory` and `workspace`.

use chrono::{Local, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::core::store::Table;
use crate::core::stores::ProjectStores;
use crate::core::types::Message;

/// `chrono` format of archive keys (second resolution).
pub const ARCHIVE_KEY_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn archive_key(at: NaiveDateTime) -> String {
    at.format(ARCHIVE_KEY_FORMAT).to_string()
}

/// Snapshot `memory` and `workspace` into `archive` under the current local time.
///
/// Returns an empty transcript so it composes like a step.
pub fn archive(stores: &ProjectStores) -> Vec<Message> {
    archive_at(stores, Local::now().naive_local())
}

/// Snapshot under an explicit timestamp.
///
/// Two calls within the same second share a key; the later one overwrites the
/// earlier snapshot.
pub fn archive_at(stores: &ProjectStores, at: NaiveDateTime) -> Vec<Message> {
    let key = archive_key(at);
    if stores.archive.contains(&key) {
        warn!(key = %key, "archive key already present; overwriting snapshot from the same second");
    }

    let mut entry = Map::new();
    entry.insert("memory".to_string(), table_value(stores.memory.snapshot()));
    entry.insert(
        "workspace".to_string(),
        table_value(stores.workspace.snapshot()),
    );
    stores.archive.set(key.clone(), Value::Object(entry));

    info!(key = %key, "archived memory and workspace");
    Vec::new()
}

fn table_value(table: Table) -> Value {
    Value::Object(table.into_iter().collect())
}
