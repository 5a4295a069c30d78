//! Running the generated entrypoint against the materialized workspace.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{info, warn};

use crate::core::store::NamespacedStore;
use crate::core::stores::ProjectStores;
use crate::core::types::Message;
use crate::io::client::ModelClient;
use crate::io::materialize::materialize_workspace;
use crate::io::process::run_command_with_timeout;
use crate::steps::required_text;

pub const RUN_SCRIPT_KEY: &str = "run.sh";
pub const EXECUTION_LOG_KEY: &str = "execution.log";

pub const PROJECT_PATH_KEY: &str = "project_path";
pub const WORKSPACE_PATH_KEY: &str = "workspace_path";
pub const EXECUTE_TIMEOUT_KEY: &str = "execute_timeout_secs";
pub const EXECUTE_OUTPUT_LIMIT_KEY: &str = "execute_output_limit_bytes";
pub const EXECUTE_APPROVED_KEY: &str = "execute_approved";

pub const DEFAULT_EXECUTE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_EXECUTE_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Materialize the workspace and run `bash run.sh` inside it.
///
/// Skipped (with a note in `memory["execution.log"]`) unless
/// `project_metadata["execute_approved"]` is `true`. A non-zero exit is
/// recorded in the log; spawn failures and timeouts fail the step.
pub fn execute_entrypoint(
    _client: &mut dyn ModelClient,
    stores: &ProjectStores,
) -> Result<Vec<Message>> {
    required_text(&stores.workspace, RUN_SCRIPT_KEY)?;
    let metadata = &stores.project_metadata;

    if metadata.get(EXECUTE_APPROVED_KEY) != Some(Value::Bool(true)) {
        info!("entrypoint execution not approved, skipping");
        stores
            .memory
            .set(EXECUTION_LOG_KEY, "execution skipped: not approved by operator\n");
        return Ok(Vec::new());
    }

    let dir = required_text(metadata, WORKSPACE_PATH_KEY)?;
    let dir = Path::new(&dir);
    let timeout = Duration::from_secs(
        metadata_u64(metadata, EXECUTE_TIMEOUT_KEY).unwrap_or(DEFAULT_EXECUTE_TIMEOUT_SECS),
    );
    let limit = metadata_u64(metadata, EXECUTE_OUTPUT_LIMIT_KEY)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(DEFAULT_EXECUTE_OUTPUT_LIMIT_BYTES);

    let written = materialize_workspace(&stores.workspace, dir)?;
    info!(dir = %dir.display(), files = written.len(), "running entrypoint");

    let mut cmd = Command::new("bash");
    cmd.arg(RUN_SCRIPT_KEY).current_dir(dir);
    let output = run_command_with_timeout(cmd, None, timeout, limit)
        .with_context(|| format!("run entrypoint in {}", dir.display()))?;
    stores
        .memory
        .set(EXECUTION_LOG_KEY, output.render_log(RUN_SCRIPT_KEY));

    if output.timed_out {
        return Err(anyhow!("entrypoint timed out after {:?}", timeout));
    }
    if !output.status.success() {
        warn!(exit_code = ?output.status.code(), "entrypoint exited unsuccessfully");
    }
    Ok(Vec::new())
}

fn metadata_u64(metadata: &NamespacedStore, key: &str) -> Option<u64> {
    metadata.get(key).and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use crate::test_support::{ScriptedClient, TempProject, project_stores};
    use std::fs;

    #[test]
    fn runs_script_in_materialized_workspace() {
        let project = TempProject::new();
        let stores = &project.stores;
        stores.workspace.set("greeting.txt", "hello\n");
        stores
            .workspace
            .set(RUN_SCRIPT_KEY, "cat greeting.txt\ncp greeting.txt copy.txt\n");
        let mut client = ScriptedClient::silent();

        let messages = execute_entrypoint(&mut client, stores).expect("execute");

        assert!(messages.is_empty());
        assert!(client.requests.is_empty());
        let copy = fs::read_to_string(project.workspace_dir().join("copy.txt")).expect("copy");
        assert_eq!(copy, "hello\n");
        let log = stores.memory.get(EXECUTION_LOG_KEY).expect("log");
        assert!(log.as_str().expect("text").contains("hello"));
    }

    #[test]
    fn failing_script_is_recorded_not_raised() {
        let project = TempProject::new();
        let stores = &project.stores;
        stores.workspace.set(RUN_SCRIPT_KEY, "echo broken >&2\nexit 3\n");

        execute_entrypoint(&mut ScriptedClient::silent(), stores).expect("execute");

        let log = stores.memory.get(EXECUTION_LOG_KEY).expect("log");
        let log = log.as_str().expect("text");
        assert!(log.contains("broken"));
        assert!(log.contains("[run.sh exit status: 3]"));
    }

    #[test]
    fn timeout_fails_the_step() {
        let project = TempProject::new();
        let stores = &project.stores;
        stores.workspace.set(RUN_SCRIPT_KEY, "exec sleep 5\n");
        stores.project_metadata.set(EXECUTE_TIMEOUT_KEY, 1);

        let err = execute_entrypoint(&mut ScriptedClient::silent(), stores).unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(stores.memory.contains(EXECUTION_LOG_KEY));
    }

    #[test]
    fn timeout_stops_commands_the_script_is_waiting_on() {
        let project = TempProject::new();
        let stores = &project.stores;
        stores.workspace.set(RUN_SCRIPT_KEY, "sleep 6\necho done\n");
        stores.project_metadata.set(EXECUTE_TIMEOUT_KEY, 1);

        let started = std::time::Instant::now();
        let err = execute_entrypoint(&mut ScriptedClient::silent(), stores).unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(
            started.elapsed() < Duration::from_secs(4),
            "took {:?}",
            started.elapsed()
        );
        let log = stores.memory.get(EXECUTION_LOG_KEY).expect("log");
        assert!(!log.as_str().expect("text").contains("done"));
    }

    #[test]
    fn unapproved_execution_is_skipped() {
        let project = TempProject::new();
        let stores = &project.stores;
        stores.workspace.set(RUN_SCRIPT_KEY, "touch ran.txt\n");
        stores.project_metadata.set(EXECUTE_APPROVED_KEY, false);

        execute_entrypoint(&mut ScriptedClient::silent(), stores).expect("execute");

        assert!(!project.workspace_dir().join("ran.txt").exists());
        let log = stores.memory.get(EXECUTION_LOG_KEY).expect("log");
        assert!(log.as_str().expect("text").contains("skipped"));
    }

    #[test]
    fn missing_run_script_is_key_not_found() {
        let stores = project_stores();
        let err = execute_entrypoint(&mut ScriptedClient::silent(), &stores).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::key_not_found("workspace", RUN_SCRIPT_KEY))
        );
    }
}
