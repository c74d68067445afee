//! Mediator (spec §4.M): composes every other kernel module into the
//! per-message pipeline that sits between an inbound frontend message and a
//! dispatched agent turn.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod dispatch;
mod identity;
mod mediator;

pub use dispatch::{AgentDispatchRequest, AgentDispatcher, AgentReplyStream, KernelToolAuthorizer, ToolAuthorizer, UnconfiguredDispatcher};
pub use identity::{Ban, BanList, IdentityLink, IdentityLinks};
pub use mediator::{InboundMessage, Mediator, MediatorConfig, MediatorOutcome};
