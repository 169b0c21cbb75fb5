//! Type definitions for chat backends
//!
//! Backend-neutral request parameters, messages, completions and token
//! usage counters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

use crate::config::BackendConfig;

/// Answer text used when a backend returns no completion at all
pub const NO_REPLY_TEXT: &str = "抱歉，没有获得有效回复。";

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Sampling parameters sent alongside the messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Zero leaves the backend default in place
    #[serde(default)]
    pub top_p: f32,
    #[serde(default)]
    pub stream: bool,
}

impl ChatParameters {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for ChatParameters {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

impl From<&BackendConfig> for ChatParameters {
    fn from(config: &BackendConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            stream: false,
        }
    }
}

/// One completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub index: u32,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub finish_reason: String,
}

/// Token usage counters reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tokens ({} prompt + {} completion)",
            self.total_tokens, self.prompt_tokens, self.completion_tokens
        )
    }
}

/// Backend answer: ordered completions plus usage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub completions: Vec<Completion>,
    pub usage: Usage,
}

impl ChatResponse {
    /// Content of the first completion, if any
    pub fn first_content(&self) -> Option<&str> {
        self.completions.first().map(|c| c.content.as_str())
    }

    /// First completion's content or the fixed no-reply text
    pub fn answer_text(&self) -> String {
        self.first_content().unwrap_or(NO_REPLY_TEXT).to_string()
    }
}
