//! The seam between the Mediator and the agent runtime.
//!
//! Spec.md draws the agent runtime as external to the kernel ("external
//! message → Mediator → ... → agent runtime (external) → Tool Guard on
//! every tool call → ... → Secret Redactor on outbound stream → external"),
//! and SPEC_FULL.md's Non-goals exclude "LLM runtime internals" outright.
//! `astrid-policy` already has precedent for this shape: it depends on
//! `astrid_llm::provider::LlmProvider` abstractly for its observer stage
//! rather than linking a concrete provider. [`AgentDispatcher`] plays the
//! same role here for step 6's "dispatch to Session Manager + agent
//! runtime" — the Mediator drives the pipeline up to and including Secret
//! Redaction of the reply stream, but never runs a model or a tool itself.

use std::pin::Pin;
use std::sync::Arc;

use astrid_core::{KernelError, KernelResult, Scope, SessionId, Tier};
use astrid_tools::{Decision, ToolCallRequest, ToolGuard};
use futures::Stream;

/// A raw, unredacted reply stream from the agent runtime. The Mediator
/// pipes every chunk through [`astrid_redact::Redactor`] before it ever
/// reaches a caller.
pub type AgentReplyStream = Pin<Box<dyn Stream<Item = KernelResult<String>> + Send>>;

/// Authorizes one tool call, run by the agent runtime before it executes
/// each tool (spec §4.M: "Tool Guard runs before each call").
///
/// The kernel owns the only implementation ([`KernelToolAuthorizer`]); the
/// trait exists so the agent runtime — which this crate never links —
/// can call back into it without this crate depending on whatever crate
/// implements tool execution.
pub trait ToolAuthorizer: Send + Sync {
    /// Decide whether `request` may proceed.
    fn authorize(&self, request: &ToolCallRequest) -> Decision;
}

/// [`ToolAuthorizer`] backed by the kernel's own [`ToolGuard`].
pub struct KernelToolAuthorizer {
    guard: ToolGuard,
}

impl KernelToolAuthorizer {
    /// Wrap `guard`.
    #[must_use]
    pub fn new(guard: ToolGuard) -> Self {
        Self { guard }
    }
}

impl ToolAuthorizer for KernelToolAuthorizer {
    fn authorize(&self, request: &ToolCallRequest) -> Decision {
        self.guard.evaluate(request)
    }
}

/// Everything the agent runtime needs to run one dispatch.
pub struct AgentDispatchRequest {
    /// The session this turn belongs to.
    pub session_id: SessionId,
    /// Permission tier the turn runs at.
    pub tier: Tier,
    /// Trust zone the inbound message originated from.
    pub scope: Scope,
    /// Resolved local user id, if the chat is linked.
    pub user_id: Option<String>,
    /// Pool key the session was dispatched through.
    pub pool_key: String,
    /// The message body to run.
    pub body: String,
    /// Opaque reference to attached media, if any.
    pub media_ref: Option<String>,
    /// Authorizes every tool call the runtime makes during this turn.
    pub authorizer: Arc<dyn ToolAuthorizer>,
    /// Cancelled on operator `/stop`, session reset, or shutdown (spec §5).
    pub cancel: tokio_util::sync::CancellationToken,
}

/// The agent runtime, external to this kernel (spec §1/§6 Non-goals).
#[async_trait::async_trait]
pub trait AgentDispatcher: Send + Sync {
    /// Run one turn, returning a stream of raw reply chunks.
    ///
    /// # Errors
    ///
    /// [`KernelError::ContextOverflow`] signals the session's context
    /// window was exceeded; the Mediator resets the session and retries
    /// exactly once (spec §8 scenario 5). Any other error propagates as a
    /// failed dispatch.
    async fn dispatch(&self, request: AgentDispatchRequest) -> KernelResult<AgentReplyStream>;
}

/// An [`AgentDispatcher`] that always fails with [`KernelError::NotConfigured`].
///
/// Used where a kernel deployment runs without a wired-up agent runtime
/// (e.g. exercising only the Mediator's policy/ban/TOTP/approval surface).
pub struct UnconfiguredDispatcher;

#[async_trait::async_trait]
impl AgentDispatcher for UnconfiguredDispatcher {
    async fn dispatch(&self, _request: AgentDispatchRequest) -> KernelResult<AgentReplyStream> {
        Err(KernelError::NotConfigured("no agent runtime wired up".to_string()))
    }
}
