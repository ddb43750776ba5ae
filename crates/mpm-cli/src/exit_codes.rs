//! Process exit codes (§6 CLI surface): `0` on success, `-1` on
//! argument errors. §7 also requires a non-zero code for fatal
//! collaborator failures (DB, rules file, result directory); the spec
//! doesn't name a specific value for that case, so this CLI reserves a
//! distinct `FATAL` code rather than overloading `ARGS_ERROR`.

/// Successful run.
pub const OK: i32 = 0;
/// Usage/argument error.
pub const ARGS_ERROR: i32 = -1;
/// A fatal error surfaced by the engine or a collaborator (invariant
/// violation, I/O failure, regex-synthesis exhaustion).
pub const FATAL: i32 = 1;
