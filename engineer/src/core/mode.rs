//! Step-mode selection.

use std::fmt;
use std::str::FromStr;

use crate::core::error::ConfigError;

/// Which ordered step sequence an invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepMode {
    Default,
    ImproveCode,
    ExecuteOnly,
    UseFeedback,
    Evaluate,
}

impl StepMode {
    pub const ALL: [StepMode; 5] = [
        StepMode::Default,
        StepMode::ImproveCode,
        StepMode::ExecuteOnly,
        StepMode::UseFeedback,
        StepMode::Evaluate,
    ];

    pub const NAMES: [&'static str; 5] = [
        "default",
        "improve-code",
        "execute-only",
        "use-feedback",
        "evaluate",
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepMode::Default => "default",
            StepMode::ImproveCode => "improve-code",
            StepMode::ExecuteOnly => "execute-only",
            StepMode::UseFeedback => "use-feedback",
            StepMode::Evaluate => "evaluate",
        }
    }

    /// False for modes that resume or inspect existing artifacts. Those skip
    /// archiving and never prompt the operator.
    pub fn is_fresh(self) -> bool {
        !matches!(
            self,
            StepMode::ExecuteOnly | StepMode::UseFeedback | StepMode::Evaluate
        )
    }

    /// `--improve` turns the default mode into code improvement.
    pub fn with_improve(self, improve: bool) -> Self {
        if improve && self == StepMode::Default {
            StepMode::ImproveCode
        } else {
            self
        }
    }
}

impl FromStr for StepMode {
    type Err = ConfigError;

    /// Accepts kebab-case or snake_case, case-insensitive.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        StepMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownStepMode(raw.to_string()))
    }
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
