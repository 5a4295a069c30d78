//! Recording the operator's review of a run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::stores::ProjectStores;
use crate::core::types::Message;
use crate::io::client::ModelClient;

pub const REVIEW_KEY: &str = "review";

/// Operator verdict on the generated code. Unanswered questions stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    pub ran: Option<bool>,
    pub perfect: Option<bool>,
    pub works: Option<bool>,
    pub comments: String,
}

/// Copy `input["review"]` into `memory["review"]`.
pub fn collect_review(
    _client: &mut dyn ModelClient,
    stores: &ProjectStores,
) -> Result<Vec<Message>> {
    let raw = stores.input.get_required(REVIEW_KEY)?;
    let review: Review = serde_json::from_value(raw).context("parse input review")?;
    info!(ran = ?review.ran, works = ?review.works, "review collected");
    stores
        .memory
        .set(REVIEW_KEY, serde_json::to_value(&review).context("encode review")?);
    Ok(Vec::new())
}
