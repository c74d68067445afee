//! Shared test utilities for the Astrid Security Mediation Kernel.
//!
//! A dev-dependency for any crate that needs an in-memory database, a
//! stand-in [`astrid_mediator::AgentDispatcher`], or a quick
//! [`astrid_mediator::InboundMessage`] fixture without repeating the
//! boilerplate in every test module.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! astrid-test.workspace = true
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
