//! Tool Guard (spec §4.I): the pre-tool-use decision gate every agent tool
//! call passes through, plus the post-tool output-size guard.
//!
//! This crate decides whether a tool call may run and how its output gets
//! truncated; it does not execute tools itself. Running `Bash`, reading or
//! writing files, and the rest of the agent runtime live outside the kernel.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod guard;
mod truncate;
mod types;

pub use guard::{GuardConfig, ToolGuard};
pub use truncate::{truncate_at_char_boundary, truncate_with_marker};
pub use types::{Decision, ToolCallRequest, ToolName};
