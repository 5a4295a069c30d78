//! Sequential step execution with per-step transcript logging.
//!
//! After each step returns, its transcript is serialized by the client and
//! stored in `logs` under the step's name. Once every step has run, the
//! client's usage summary is stored under [`TOKEN_USAGE_KEY`]. A failing step
//! stops the run: its error propagates unchanged, earlier log entries remain,
//! and no entry is written for the failing step or for `token_usage`.

use anyhow::Result;
use tracing::{error, info, info_span};

use crate::core::mode::StepMode;
use crate::core::stores::ProjectStores;
use crate::io::client::ModelClient;
use crate::steps::{Step, steps_for};

pub const TOKEN_USAGE_KEY: &str = "token_usage";

/// Names of the steps that completed, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub completed: Vec<&'static str>,
}

/// Run `steps` in order against `stores`.
pub fn run_steps(
    client: &mut dyn ModelClient,
    stores: &ProjectStores,
    steps: &[Step],
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for step in steps {
        let _span = info_span!("step", name = step.name).entered();
        info!("step started");
        let messages = match step.call(client, stores) {
            Ok(messages) => messages,
            Err(err) => {
                error!(err = %format!("{err:#}"), "step failed");
                return Err(err);
            }
        };
        let transcript = client.serialize_messages(&messages)?;
        stores.logs.set(step.name, transcript);
        info!(messages = messages.len(), "step completed");
        summary.completed.push(step.name);
    }
    stores.logs.set(TOKEN_USAGE_KEY, client.usage_summary());
    Ok(summary)
}

/// Run the fixed step list for `mode`.
pub fn run_mode(
    client: &mut dyn ModelClient,
    stores: &ProjectStores,
    mode: StepMode,
) -> Result<RunSummary> {
    info!(mode = %mode, "running steps");
    run_steps(client, stores, steps_for(mode))
}
