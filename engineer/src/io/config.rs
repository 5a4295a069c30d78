//! Project configuration stored under `<project>/.engineer/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::mode::StepMode;

/// Engineer configuration (TOML).
///
/// Hand-editable; every missing field falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Step mode used when the command line does not pick one.
    pub steps: String,

    pub model: ModelConfig,

    pub execute: ExecuteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Argv of the model command. Receives a JSON request on stdin and prints
    /// the assistant reply on stdout.
    pub command: Vec<String>,

    /// Model id forwarded to the command.
    pub name: String,

    pub temperature: f64,

    /// Wall-clock budget per model request.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecuteConfig {
    /// Wall-clock budget for running the generated entrypoint.
    pub timeout_secs: u64,

    pub output_limit_bytes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string()],
            name: "gpt-4".to_string(),
            temperature: 0.1,
            timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steps: StepMode::Default.as_str().to_string(),
            model: ModelConfig::default(),
            execute: ExecuteConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.step_mode()?;
        if self.model.command.is_empty() || self.model.command[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "model.command must be a non-empty array".to_string(),
            ));
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.name must be set".to_string()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(
                "model.temperature must be within 0.0..=2.0".to_string(),
            ));
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "model.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.model.output_limit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "model.output_limit_bytes must be > 0".to_string(),
            ));
        }
        if self.execute.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "execute.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.execute.output_limit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "execute.output_limit_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn step_mode(&self) -> Result<StepMode, ConfigError> {
        self.steps.parse()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.step_mode(), Ok(StepMode::Default));
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".engineer/config.toml");
        let mut cfg = EngineConfig::default();
        cfg.steps = "evaluate".to_string();
        cfg.model.command = vec!["my-llm".to_string(), "--json".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[model]\nname = \"local\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model.name, "local");
        assert_eq!(cfg.model.command, vec!["llm".to_string()]);
        assert_eq!(cfg.execute, ExecuteConfig::default());
    }

    #[test]
    fn unknown_step_mode_is_a_configuration_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "steps = \"benchmark\"\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownStepMode("benchmark".to_string()))
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = EngineConfig::default();
        cfg.model.temperature = 3.5;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.model.command = vec![" ".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.execute.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }
}
