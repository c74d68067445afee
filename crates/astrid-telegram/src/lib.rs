//! Telegram channel adapter (spec §5): a thin `teloxide` frontend wired
//! directly into [`astrid_mediator::Mediator`]. No daemon, no RPC layer —
//! each inbound Telegram update becomes one [`astrid_mediator::InboundMessage`]
//! run straight through the kernel pipeline.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod format;
mod handler;

pub use error::TelegramBotError;
pub use handler::{BotState, run};
