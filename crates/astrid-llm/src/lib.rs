//! LLM provider abstraction with streaming support.
//!
//! [`LlmProvider`] is the trait every backend implements; [`ClaudeProvider`]
//! and [`OpenAiCompatProvider`] are the two concrete backends. The Policy
//! Engine's LLM observer and the agent runtime both depend only on the
//! trait, never a concrete provider.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod claude;
mod error;
mod openai_compat;
pub mod prelude;
pub mod provider;
mod types;
mod zai;

pub use claude::ClaudeProvider;
pub use error::{LlmError, LlmResult};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{LlmProvider, ProviderConfig, StreamBox};
pub use types::{
    ContentPart, LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StopReason,
    StreamEvent, ToolCall, ToolCallResult, Usage,
};
pub use zai::ZaiProvider;
