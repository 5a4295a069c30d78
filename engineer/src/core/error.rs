//! Typed failures raised by the store and step-mode layers.
//!
//! Orchestration code works in `anyhow::Result`; these types convert into it
//! and stay downcastable so callers can tell a missing key from other failures.

use thiserror::Error;

/// Failure of a required lookup on a [`NamespacedStore`](crate::core::store::NamespacedStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Key '{key}' not found in '{namespace}'")]
    KeyNotFound { namespace: String, key: String },
}

impl StoreError {
    pub fn key_not_found(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

/// Invalid invocation settings, detected before any step runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown step mode '{0}' (expected one of: {modes})", modes = crate::core::mode::StepMode::NAMES.join(", "))]
    UnknownStepMode(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
