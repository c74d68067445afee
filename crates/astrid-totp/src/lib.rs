//! TOTP Gate (spec §4.H): out-of-band TOTP verification sitting in front of
//! the Mediator's dispatch path, fail-closed whenever the daemon cannot be
//! reached for a chat with an active identity link.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod client;
mod gate;

pub use client::{DaemonError, TotpDaemonClient, UnixSocketTotpDaemon};
pub use gate::{GateConfig, GateResult, ParkedMessage, TotpGate};
