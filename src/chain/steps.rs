//! Built-in steps: retrieval, templating and model calls

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

use crate::chain::step::{Step, StepContext};
use crate::errors::Result;
use crate::models::{ChatParameters, Message, ModelBackend};
use crate::prompt::{Bindings, PromptEngine};
use crate::rag::{RagEngine, DEFAULT_LIMIT};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Replaces a string query with its RAG-augmented form.
///
/// Non-string values pass through untouched.
pub struct RetrievalStep {
    rag: RagEngine,
    limit: usize,
    telemetry: Option<TelemetryCollector>,
}

impl RetrievalStep {
    pub fn new(rag: RagEngine) -> Self {
        Self {
            rag,
            limit: DEFAULT_LIMIT,
            telemetry: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

#[async_trait]
impl Step for RetrievalStep {
    fn name(&self) -> &str {
        "retrieval"
    }

    async fn execute(&self, ctx: &StepContext, input: Value) -> Result<Value> {
        let query = match input {
            Value::String(query) => query,
            other => return Ok(other),
        };

        let result = ctx.guard(self.rag.execute(&query, self.limit)).await?;
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::DocumentsRetrieved {
                count: result.documents_retrieved(),
                timestamp: Instant::now(),
            });
        }

        Ok(Value::String(result.augmented_prompt))
    }
}

/// Renders a named template with the input bound to one variable
pub struct TemplateStep {
    prompts: Arc<RwLock<PromptEngine>>,
    template: String,
    variable: String,
    bindings: Bindings,
}

impl TemplateStep {
    /// Bind the input as `variable` when rendering `template`
    pub fn new(
        prompts: Arc<RwLock<PromptEngine>>,
        template: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            prompts,
            template: template.into(),
            variable: variable.into(),
            bindings: Bindings::new(),
        }
    }

    /// Fixed binding applied on every render; the input wins on conflict
    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl Step for TemplateStep {
    fn name(&self) -> &str {
        "template"
    }

    async fn execute(&self, _ctx: &StepContext, input: Value) -> Result<Value> {
        let mut bindings = self.bindings.clone();
        bindings.insert(self.variable.clone(), input);

        let prompts = self.prompts.read().await;
        let rendered = prompts.render(&self.template, &bindings)?;
        Ok(Value::String(rendered))
    }
}

/// Sends the input to the model as one user message
pub struct ChatStep {
    backend: Arc<dyn ModelBackend>,
    params: ChatParameters,
    system_prompt: Option<String>,
    telemetry: Option<TelemetryCollector>,
}

impl ChatStep {
    pub fn new(backend: Arc<dyn ModelBackend>, params: ChatParameters) -> Self {
        Self {
            backend,
            params,
            system_prompt: None,
            telemetry: None,
        }
    }

    /// Prepend a system message to every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

#[async_trait]
impl Step for ChatStep {
    fn name(&self) -> &str {
        "chat"
    }

    async fn execute(&self, ctx: &StepContext, input: Value) -> Result<Value> {
        let prompt = match input {
            Value::String(text) => text,
            other => other.to_string(),
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        debug!(backend = self.backend.name(), model = %self.params.model, "chat step");
        let response = ctx.guard(self.backend.chat(&messages, &self.params)).await?;

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_usage(&self.params.model, response.usage);
        }

        Ok(Value::String(response.answer_text()))
    }
}
