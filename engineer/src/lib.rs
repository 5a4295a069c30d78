//! Project state stores and the step pipeline of a code-generating assistant.
//!
//! All state of a project lives in one root mapping of namespaces. Named
//! steps read and write it through [`core::stores::ProjectStores`], and the
//! pipeline records each step's transcript in the `logs` namespace.
//!
//! - **[`core`]**: The stores, archiving, step modes and other pure logic.
//!   No process or filesystem access.
//! - **[`io`]**: Side effects: model client, config, store file, operator
//!   prompts, workspace materialization and subprocesses.
//! - **[`steps`]**: The named steps and the fixed mode → step mapping.
//!
//! [`session`] and [`pipeline`] tie these together for the CLI.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
