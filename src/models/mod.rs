//! Model backend module
//!
//! This module provides the chat backend abstraction:
//! - The `ModelBackend` trait consumed by the core
//! - An OpenAI-compatible HTTP client
//! - A scripted offline backend
//! - Messages, parameters, completions and usage counters

pub mod backend;
pub mod client;
pub mod types;

// Re-export key types for convenience
pub use backend::{ModelBackend, ScriptedBackend};
pub use client::OpenAiClient;
pub use types::{ChatParameters, ChatResponse, Completion, Message, Usage, NO_REPLY_TEXT};
