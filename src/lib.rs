//! llm-tools - Prompt templates, keyword RAG and step chains
//!
//! Orchestrates calls to an OpenAI-compatible chat model through three
//! composable stages: templated prompt construction, lexical document
//! retrieval, and ordered chains of steps mixing both with model calls.
//!
//! # Architecture
//!
//! - **prompt**: named `{{.name}}` templates, variable extraction, rendering
//! - **rag**: in-memory keyword retriever and context augmentation
//! - **chain**: ordered steps over one threaded value, with cancellation
//! - **models**: backend contract, OpenAI-compatible client, usage counters
//! - **integration**: the `Toolkit` request context tying it all together

// Core
pub mod errors;
pub mod prompt;
pub mod rag;
pub mod chain;
pub mod models;

// Re-export commonly used types
pub use errors::{LlmError, Result};

// Interface layer
pub mod config;
pub mod telemetry;
pub mod cli;
pub mod integration;

pub use chain::{Chain, Step, StepContext};
pub use integration::{Answer, Toolkit};
pub use models::{ModelBackend, OpenAiClient, ScriptedBackend};
pub use prompt::{PromptEngine, Template};
pub use rag::{Document, RagEngine, Retriever, SimpleRetriever};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
