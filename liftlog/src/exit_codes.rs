//! Stable exit codes for liftlog CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, config, or import file, or any other failure.
pub const INVALID: i32 = 1;
/// A routine, exercise, or other document does not exist.
pub const NOT_FOUND: i32 = 2;
/// `liftlog workout` found no routine to start and no cached session.
pub const NO_SESSION: i32 = 3;
