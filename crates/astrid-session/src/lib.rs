//! Session Manager (spec §4.J): `(thread_key, pool_key) → session_id`,
//! atomic turn serialization, and context-overflow recovery.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod map;
mod overflow;

pub use map::{SessionKey, SessionMap, TurnStartResult};
pub use overflow::{is_context_overflow, run_with_overflow_recovery};
