//! In-process completion gateway that replays scripted replies.

use crate::error::GatewayError;
use crate::gateway::CompletionGateway;
use crate::model::{Message, SessionKey};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// One scripted outcome of a `complete` call.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
    /// Waits before answering; used to exercise timeouts and cancellation.
    Delayed(Duration, String),
}

/// Gateway that answers from a queue and records every request it saw.
///
/// When the queue is empty the fallback reply is used, if one is set.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<String>,
    calls: Mutex<Vec<(SessionKey, Vec<Message>)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every call with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    pub fn push(&self, reply: ScriptedReply) -> &Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn push_text(&self, reply: impl Into<String>) -> &Self {
        self.push(ScriptedReply::Text(reply.into()))
    }

    /// Every request received so far, in call order.
    pub fn calls(&self) -> Vec<(SessionKey, Vec<Message>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(
        &self,
        key: &SessionKey,
        messages: &[Message],
    ) -> Result<String, GatewayError> {
        self.calls.lock().push((key.clone(), messages.to_vec()));
        let next = self.replies.lock().pop_front();
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(reason)) => Err(GatewayError::Transport(reason)),
            Some(ScriptedReply::Delayed(wait, text)) => {
                tokio::time::sleep(wait).await;
                Ok(text)
            }
            None => self.fallback.clone().ok_or(GatewayError::EmptyReply),
        }
    }
}
