//! Stable exit codes for the aigmos binary.

/// Every requested line ran (line-level errors are console output, not exit
/// failures).
pub const OK: i32 = 0;
/// Invalid invocation, config, state file or script.
pub const INVALID: i32 = 1;
