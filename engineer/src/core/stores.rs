//! The fixed aggregate of namespaces that make up one project's state.

use crate::core::mode::StepMode;
use crate::core::store::{NamespacedStore, RootStore};

/// Identifier bound to [`ProjectStores::input`]. Differs from the field name.
pub const INPUT_IDENTIFIER: &str = "input_prompt";

/// Which identifier the seventh slot binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Seventh slot is `project_metadata`.
    #[default]
    Standard,
    /// Seventh slot is `improve`; same shape otherwise.
    Improve,
}

impl Layout {
    /// Code improvement keeps its metadata apart from generation runs.
    pub fn for_mode(mode: StepMode) -> Self {
        match mode {
            StepMode::ImproveCode => Layout::Improve,
            _ => Layout::Standard,
        }
    }

    pub fn seventh_identifier(self) -> &'static str {
        match self {
            Layout::Standard => "project_metadata",
            Layout::Improve => "improve",
        }
    }
}

/// Seven named stores over one shared root. Fields are never reassigned.
#[derive(Debug, Clone)]
pub struct ProjectStores {
    pub memory: NamespacedStore,
    pub logs: NamespacedStore,
    pub preprompts: NamespacedStore,
    pub input: NamespacedStore,
    pub workspace: NamespacedStore,
    pub archive: NamespacedStore,
    /// Bound to `project_metadata`, or to `improve` under [`Layout::Improve`].
    pub project_metadata: NamespacedStore,
}

impl ProjectStores {
    pub fn open(root: &RootStore, layout: Layout) -> Self {
        Self {
            memory: root.namespace("memory"),
            logs: root.namespace("logs"),
            preprompts: root.namespace("preprompts"),
            input: root.namespace(INPUT_IDENTIFIER),
            workspace: root.namespace("workspace"),
            archive: root.namespace("archive"),
            project_metadata: root.namespace(layout.seventh_identifier()),
        }
    }

    /// The backing root shared by every field.
    pub fn root(&self) -> &RootStore {
        self.memory.root()
    }
}
