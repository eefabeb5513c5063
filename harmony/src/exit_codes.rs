//! Stable exit codes for harmony CLI commands.

/// Command succeeded and every plan ran clean.
pub const OK: i32 = 0;
/// Command failed due to an invalid suite, config or other errors.
pub const INVALID: i32 = 1;
/// `harmony run` finished but at least one plan is in error.
pub const FAILED: i32 = 4;
