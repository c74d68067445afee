//! Shared value types and error kinds for the Astrid Security Mediation Kernel.
//!
//! Every other `astrid-*` kernel crate (auth, ratelimit, circuit, redact,
//! policy, approval, totp, tools, session, broker, scheduler, mediator)
//! depends on this crate for the vocabulary it shares: tiers, scopes,
//! classifications, millisecond timestamps, and the [`KernelError`] enum
//! that every component-boundary function returns instead of panicking or
//! throwing.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
pub mod prelude;
mod types;

pub use error::{KernelError, KernelResult};
pub use types::{
    Classification, MemoryCategory, MemorySource, RequestId, Scope, SessionId, Tier, Timestamp,
    TrustLevel,
};
