//! Stable exit codes for the `engineer` CLI.

/// Every step completed.
pub const OK: i32 = 0;
/// Invalid invocation or unusable project state: unknown step mode, bad
/// config or store file, or a store that could not be written back. Steps
/// have run only in the last case; a step error is printed before it.
pub const INVALID: i32 = 1;
/// A step failed. Steps before it completed and the store was persisted.
pub const STEP_FAILED: i32 = 2;
