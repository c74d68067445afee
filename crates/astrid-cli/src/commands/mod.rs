//! Operator subcommand handlers (spec §6).

pub(crate) mod bans;
pub(crate) mod cron;
pub(crate) mod memory;
pub(crate) mod reset_db;
pub(crate) mod sessions;

/// What a subcommand handler settled on, distinct from an unexpected error
/// bubbling out of `main` (spec §6: exit 0 success, 1 policy/validation
/// failure, >1 reserved for unexpected errors).
pub(crate) enum Outcome {
    /// The operation completed as requested.
    Success,
    /// The operation was refused or failed validation; not a bug.
    Failure(String),
}
