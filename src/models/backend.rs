//! Model backend contract
//!
//! The core treats the language model as an opaque capability: messages in,
//! completions and usage out. Failures are surfaced verbatim as
//! [`LlmError::Backend`] and never interpreted.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::{LlmError, Result};
use crate::models::types::{ChatParameters, ChatResponse, Completion, Message, Usage};

/// A chat-capable language model backend
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send an ordered message list, get completions plus token usage
    async fn chat(&self, messages: &[Message], params: &ChatParameters) -> Result<ChatResponse>;

    /// Short backend identifier for logs
    fn name(&self) -> &str;
}

/// Offline backend answering from a script.
///
/// Queued replies are consumed in order; once the queue is empty the last
/// message's content is echoed back. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.lock_replies().push_back(Err(message.into()));
        self
    }

    /// Message lists received so far
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Rough token estimate: ~4 characters per token
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn chat(&self, messages: &[Message], params: &ChatParameters) -> Result<ChatResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(messages.to_vec());

        let scripted = self.lock_replies().pop_front();
        let content = match scripted {
            Some(Ok(text)) => text,
            Some(Err(message)) => return Err(LlmError::backend(message)),
            None => messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        };

        let prompt_tokens: u32 = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        let completion_tokens = estimate_tokens(&content);

        Ok(ChatResponse {
            id: format!("scripted-{}", self.requests().len()),
            model: params.model.clone(),
            completions: vec![Completion {
                index: 0,
                role: "assistant".to_string(),
                content,
                finish_reason: "stop".to_string(),
            }],
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
