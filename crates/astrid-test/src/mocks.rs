//! Mock implementations of kernel-boundary traits.

use std::collections::VecDeque;
use std::sync::Mutex;

use astrid_core::{KernelError, KernelResult};
use astrid_mediator::{AgentDispatchRequest, AgentDispatcher, AgentReplyStream};
use async_trait::async_trait;
use futures::stream;

/// Echoes the dispatched body back as a single reply chunk.
pub struct EchoAgentDispatcher;

#[async_trait]
impl AgentDispatcher for EchoAgentDispatcher {
    async fn dispatch(&self, request: AgentDispatchRequest) -> KernelResult<AgentReplyStream> {
        Ok(Box::pin(stream::iter(vec![Ok(format!("echo: {}", request.body))])))
    }
}

/// An [`AgentDispatcher`] that replays a queue of scripted outcomes, one
/// per call. Panics if the queue runs dry — a test driving more turns than
/// it scripted is a test bug, not a fixture limitation.
#[derive(Default)]
pub struct ScriptedAgentDispatcher {
    outcomes: Mutex<VecDeque<KernelResult<Vec<String>>>>,
}

impl ScriptedAgentDispatcher {
    /// An empty dispatcher; queue outcomes with [`Self::push_reply`] or
    /// [`Self::push_error`] before use.
    #[must_use]
    pub fn new() -> Self {
        Self { outcomes: Mutex::new(VecDeque::new()) }
    }

    /// Queue a successful dispatch that streams `chunks` in order.
    #[must_use]
    pub fn push_reply(self, chunks: Vec<String>) -> Self {
        self.outcomes.lock().expect("scripted dispatcher lock poisoned").push_back(Ok(chunks));
        self
    }

    /// Queue a failed dispatch.
    #[must_use]
    pub fn push_error(self, err: KernelError) -> Self {
        self.outcomes.lock().expect("scripted dispatcher lock poisoned").push_back(Err(err));
        self
    }
}

#[async_trait]
impl AgentDispatcher for ScriptedAgentDispatcher {
    async fn dispatch(&self, _request: AgentDispatchRequest) -> KernelResult<AgentReplyStream> {
        let outcome = self
            .outcomes
            .lock()
            .expect("scripted dispatcher lock poisoned")
            .pop_front()
            .expect("ScriptedAgentDispatcher queue ran dry");
        match outcome {
            Ok(chunks) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_core::{Scope, SessionId, Tier};
    use futures::StreamExt;
    use std::sync::Arc;

    fn request(body: &str) -> AgentDispatchRequest {
        AgentDispatchRequest {
            session_id: SessionId::new(),
            tier: Tier::ReadOnly,
            scope: Scope::Telegram,
            user_id: None,
            pool_key: "telegram:social".to_owned(),
            body: body.to_owned(),
            media_ref: None,
            authorizer: Arc::new(crate::fixtures::allow_all_authorizer()),
            cancel: tokio_util::sync::CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn echo_dispatcher_echoes_body() {
        let dispatcher = EchoAgentDispatcher;
        let mut stream = dispatcher.dispatch(request("hi")).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, "echo: hi");
    }

    #[tokio::test]
    async fn scripted_dispatcher_replays_in_order() {
        let dispatcher = ScriptedAgentDispatcher::new()
            .push_reply(vec!["first".to_owned()])
            .push_error(KernelError::ContextOverflow);

        let mut first = dispatcher.dispatch(request("a")).await.unwrap();
        assert_eq!(first.next().await.unwrap().unwrap(), "first");

        let second = dispatcher.dispatch(request("b")).await;
        assert_eq!(second.err(), Some(KernelError::ContextOverflow));
    }

    #[tokio::test]
    #[should_panic(expected = "queue ran dry")]
    async fn scripted_dispatcher_panics_on_empty_queue() {
        let dispatcher = ScriptedAgentDispatcher::new();
        let _ = dispatcher.dispatch(request("a")).await;
    }
}
