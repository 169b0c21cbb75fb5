//! Error types for llm-tools
//!
//! One error enum covers the prompt engine, the retriever, the RAG engine,
//! the chain executor and the model backend. The chain executor only adds
//! positional context, so the original failure stays reachable through
//! [`LlmError::root_cause`].

use thiserror::Error;

/// Main error type for the llm-tools crate
#[derive(Error, Debug)]
pub enum LlmError {
    /// A required field is missing on a write operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup by name or id missed
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Template substitution failed
    #[error("Failed to render template '{template}': {reason}")]
    TemplateRender { template: String, reason: String },

    /// The retriever behind a RAG engine failed
    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] Box<LlmError>),

    /// A chain step failed, tagged with its zero-based index
    #[error("Step {index} failed: {source}")]
    StepExecution {
        index: usize,
        #[source]
        source: Box<LlmError>,
    },

    /// Opaque failure reported by the model backend
    #[error("Model backend error: {0}")]
    Backend(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// The caller's deadline passed
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure raised by a caller-supplied step
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for llm-tools operations
pub type Result<T> = std::result::Result<T, LlmError>;

impl LlmError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        LlmError::InvalidArgument(msg.into())
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        LlmError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn template_render(template: impl Into<String>, reason: impl Into<String>) -> Self {
        LlmError::TemplateRender {
            template: template.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        LlmError::Backend(msg.into())
    }

    /// Strip step-index and retrieval wrappers down to the original failure
    pub fn root_cause(&self) -> &LlmError {
        match self {
            LlmError::StepExecution { source, .. } | LlmError::Retrieval(source) => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Index of the outermost failed chain step, if any
    pub fn step_index(&self) -> Option<usize> {
        match self {
            LlmError::StepExecution { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), LlmError::NotFound { .. })
    }
}

/// Convert anyhow errors raised inside caller-supplied steps
impl From<anyhow::Error> for LlmError {
    fn from(err: anyhow::Error) -> Self {
        LlmError::Generic(err.to_string())
    }
}
