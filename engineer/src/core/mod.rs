//! Deterministic, in-memory logic shared by the pipeline.
//!
//! Core modules do no filesystem or process I/O. They operate on the session's
//! root store and plain data, which keeps them testable in isolation.

pub mod archive;
pub mod error;
pub mod files;
pub mod findings;
pub mod mode;
pub mod store;
pub mod stores;
pub mod types;
pub mod usage;
