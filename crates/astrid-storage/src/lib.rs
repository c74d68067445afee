//! Astrid Storage — the Security Mediation Kernel's persistent transactional
//! store (spec §4.A).
//!
//! A single [`Database`] (SurrealDB, embedded `SurrealKV` in production,
//! `mem://` in tests) backs every other kernel component: sessions,
//! approvals, identity links, rate buckets, circuit state, cron jobs, and
//! memory entries all live here as named tables. [`tables`] provides typed
//! access, including the atomic delete-if-present operation required for
//! one-shot approval consumption and cron-job claiming.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod db;
pub mod error;
pub mod tables;

pub use db::Database;
pub use error::{StorageError, StorageResult};
