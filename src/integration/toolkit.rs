// Toolkit: explicitly constructed request context
//
// Holds the shared prompt engine, retriever, RAG engine and model backend
// for whatever serves requests. Cloning is cheap and clones share state.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::chain::{Chain, ChatStep, RetrievalStep, StepContext, TemplateStep};
use crate::config::Config;
use crate::errors::Result;
use crate::models::{ChatParameters, Message, ModelBackend, OpenAiClient, Usage};
use crate::prompt::{Bindings, PromptEngine, Template};
use crate::rag::{
    Document, RagEngine, RagResult, Retriever, SharedRetriever, SimpleRetriever, DEFAULT_LIMIT,
};
use crate::telemetry::TelemetryCollector;

/// Variable the query is bound to in every template
pub const QUERY_VARIABLE: &str = "question";

/// A model answer plus what produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub template: String,
    pub model: String,
    pub usage: Usage,
}

/// Shared engines and backend
#[derive(Clone)]
pub struct Toolkit {
    prompts: Arc<RwLock<PromptEngine>>,
    retriever: SharedRetriever,
    rag: RagEngine,
    backend: Arc<dyn ModelBackend>,
    params: ChatParameters,
    rag_limit: usize,
    telemetry: TelemetryCollector,
}

impl Toolkit {
    /// Toolkit with the built-in templates and an empty keyword retriever
    pub fn new(backend: Arc<dyn ModelBackend>, params: ChatParameters) -> Self {
        let retriever: SharedRetriever = Arc::new(RwLock::new(SimpleRetriever::new()));
        Self {
            prompts: Arc::new(RwLock::new(PromptEngine::with_defaults())),
            rag: RagEngine::new(retriever.clone()),
            retriever,
            backend,
            params,
            rag_limit: DEFAULT_LIMIT,
            telemetry: TelemetryCollector::new(),
        }
    }

    /// Toolkit talking to the configured OpenAI-compatible endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(OpenAiClient::new(&config.backend)?);
        let retriever: SharedRetriever =
            Arc::new(RwLock::new(SimpleRetriever::with_ranking(config.rag.ranking)));

        Ok(Self::new(backend, ChatParameters::from(&config.backend))
            .with_retriever(retriever)
            .with_rag_limit(config.rag.max_results))
    }

    /// Use another retriever; the RAG engine follows it
    pub fn with_retriever(mut self, retriever: SharedRetriever) -> Self {
        self.rag = RagEngine::new(retriever.clone());
        self.retriever = retriever;
        self
    }

    /// Default number of documents pulled into a context
    pub fn with_rag_limit(mut self, limit: usize) -> Self {
        self.rag_limit = limit;
        self
    }

    pub fn prompts(&self) -> &Arc<RwLock<PromptEngine>> {
        &self.prompts
    }

    pub fn retriever(&self) -> &SharedRetriever {
        &self.retriever
    }

    pub fn rag(&self) -> &RagEngine {
        &self.rag
    }

    pub fn params(&self) -> &ChatParameters {
        &self.params
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Render `template` with the query bound as `question` plus
    /// `variables` (which win on conflict), then ask the model.
    pub async fn ask(
        &self,
        query: &str,
        template: &str,
        variables: &HashMap<String, String>,
    ) -> Result<Answer> {
        let mut bindings = Bindings::new();
        bindings.insert(QUERY_VARIABLE.to_string(), query.into());
        for (name, value) in variables {
            bindings.insert(name.clone(), value.as_str().into());
        }

        let prompt = self.prompts.read().await.render(template, &bindings)?;
        self.complete(prompt, template).await
    }

    /// Augment the query with retrieved context, then ask through `template`
    /// with the augmented text as `question` plus `variables`
    pub async fn ask_with_context(
        &self,
        query: &str,
        template: &str,
        variables: &HashMap<String, String>,
        limit: usize,
    ) -> Result<Answer> {
        let augmented = self.rag.query(query, self.effective_limit(limit)).await?;
        self.ask(&augmented, template, variables).await
    }

    /// Retrieval, then `template`, then the model.
    ///
    /// `variables` are fixed bindings for the template step; the threaded
    /// value is always bound as `question`. A `limit` of zero uses the
    /// toolkit's configured limit.
    pub async fn build_chain(
        &self,
        template: &str,
        variables: &HashMap<String, String>,
        limit: usize,
    ) -> Chain {
        let chain = Chain::new().with_telemetry(self.telemetry.clone());
        chain
            .add_step(
                RetrievalStep::new(self.rag.clone())
                    .with_limit(self.effective_limit(limit))
                    .with_telemetry(self.telemetry.clone()),
            )
            .await;

        let mut template_step = TemplateStep::new(self.prompts.clone(), template, QUERY_VARIABLE);
        for (name, value) in variables {
            template_step = template_step.with_binding(name.clone(), value.as_str());
        }
        chain.add_step(template_step).await;
        chain
            .add_step(
                ChatStep::new(self.backend.clone(), self.params.clone())
                    .with_telemetry(self.telemetry.clone()),
            )
            .await;
        chain
    }

    /// Run the retrieval -> template -> model chain for one query
    pub async fn ask_chained(
        &self,
        ctx: &StepContext,
        query: &str,
        template: &str,
        variables: &HashMap<String, String>,
        limit: usize,
    ) -> Result<String> {
        let chain = self.build_chain(template, variables, limit).await;
        chain.run_string(ctx, query).await
    }

    /// Run a RAG query without calling the model
    pub async fn rag_query(&self, query: &str, limit: usize) -> Result<RagResult> {
        self.rag.execute(query, self.effective_limit(limit)).await
    }

    pub async fn add_document(&self, doc: Document) -> Result<()> {
        self.retriever.write().await.add_document(doc).await
    }

    pub async fn remove_document(&self, id: &str) -> Result<Document> {
        self.retriever.write().await.remove_document(id).await
    }

    pub async fn add_template(&self, template: Template) -> Result<()> {
        self.prompts.write().await.add_template(template)
    }

    pub async fn remove_template(&self, name: &str) -> Result<Template> {
        self.prompts.write().await.remove_template(name)
    }

    /// Template names, sorted
    pub async fn list_templates(&self) -> Vec<String> {
        let mut names = self.prompts.read().await.list_templates();
        names.sort();
        names
    }

    /// A copy of one registered template
    pub async fn describe_template(&self, name: &str) -> Result<Template> {
        Ok(self.prompts.read().await.get_template(name)?.clone())
    }

    fn effective_limit(&self, limit: usize) -> usize {
        if limit == 0 {
            self.rag_limit
        } else {
            limit
        }
    }

    async fn complete(&self, prompt: String, template: &str) -> Result<Answer> {
        debug!(template, backend = self.backend.name(), "asking model");
        let response = self
            .backend
            .chat(&[Message::user(prompt)], &self.params)
            .await?;
        self.telemetry.record_usage(&self.params.model, response.usage);
        info!(template, tokens = response.usage.total_tokens, "model answered");

        Ok(Answer {
            text: response.answer_text(),
            template: template.to_string(),
            model: self.params.model.clone(),
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::models::{ScriptedBackend, NO_REPLY_TEXT};
    use crate::rag::{sample_documents, NO_RELEVANT_DOCUMENTS};

    fn toolkit(backend: Arc<ScriptedBackend>) -> Toolkit {
        Toolkit::new(backend, ChatParameters::default())
    }

    #[tokio::test]
    async fn test_ask_renders_question() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("答案"));
        let kit = toolkit(backend.clone());

        let answer = kit.ask("什么是RAG？", "qa", &HashMap::new()).await.unwrap();
        assert_eq!(answer.text, "答案");
        assert_eq!(answer.template, "qa");
        assert_eq!(answer.model, "gpt-3.5-turbo");

        let sent = &backend.requests()[0][0];
        assert_eq!(sent.role, "user");
        assert_eq!(
            sent.content,
            "请回答以下问题：\n\n什么是RAG？\n\n请提供详细、准确的答案。"
        );
        assert_eq!(kit.telemetry().get_stats().backend_calls, 1);
    }

    #[tokio::test]
    async fn test_ask_with_extra_variables() {
        let backend = Arc::new(ScriptedBackend::new());
        let kit = toolkit(backend.clone());

        let mut vars = HashMap::new();
        vars.insert("target_language".to_string(), "English".to_string());
        vars.insert("text".to_string(), "你好".to_string());

        kit.ask("ignored", "translation", &vars).await.unwrap();
        let sent = &backend.requests()[0][0].content;
        assert!(sent.contains("English"));
        assert!(sent.contains("你好"));
    }

    #[tokio::test]
    async fn test_ask_missing_variable_never_calls_backend() {
        let backend = Arc::new(ScriptedBackend::new());
        let kit = toolkit(backend.clone());

        let err = kit.ask("q", "translation", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, LlmError::TemplateRender { .. }));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_ask_unknown_template() {
        let kit = toolkit(Arc::new(ScriptedBackend::new()));
        let err = kit.ask("q", "nope", &HashMap::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_ask_with_context_uses_documents() {
        let backend = Arc::new(ScriptedBackend::new());
        let kit = toolkit(backend.clone());
        for doc in sample_documents() {
            kit.add_document(doc).await.unwrap();
        }

        kit.ask_with_context("rag", "qa", &HashMap::new(), 0).await.unwrap();
        let sent = &backend.requests()[0][0].content;
        assert!(sent.contains("Retrieval-Augmented Generation"));
        assert!(sent.contains("问题：rag"));
    }

    #[tokio::test]
    async fn test_ask_chained_without_documents_sends_fallback() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("ok"));
        let kit = toolkit(backend.clone());

        let answer = kit
            .ask_chained(&StepContext::new(), "anything", "qa", &HashMap::new(), 0)
            .await
            .unwrap();
        assert_eq!(answer, "ok");
        assert!(backend.requests()[0][0].content.contains(NO_RELEVANT_DOCUMENTS));
        assert_eq!(kit.telemetry().get_stats().steps_succeeded, 3);
    }

    #[tokio::test]
    async fn test_empty_completion_yields_no_reply_text() {
        struct Silent;

        #[async_trait::async_trait]
        impl ModelBackend for Silent {
            async fn chat(
                &self,
                _messages: &[Message],
                _params: &ChatParameters,
            ) -> Result<crate::models::ChatResponse> {
                Ok(crate::models::ChatResponse::default())
            }

            fn name(&self) -> &str {
                "silent"
            }
        }

        let kit = Toolkit::new(Arc::new(Silent), ChatParameters::default());
        let answer = kit.ask("q", "qa", &HashMap::new()).await.unwrap();
        assert_eq!(answer.text, NO_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_document_and_template_management() {
        let kit = toolkit(Arc::new(ScriptedBackend::new()));

        kit.add_document(Document::new("a", "alpha")).await.unwrap();
        assert_eq!(kit.remove_document("a").await.unwrap().id, "a");
        assert!(kit.remove_document("a").await.unwrap_err().is_not_found());

        kit.add_template(Template::new("greet", "Hello {{.name}}"))
            .await
            .unwrap();
        let names = kit.list_templates().await;
        assert_eq!(names, vec!["code_review", "greet", "qa", "summary", "translation"]);
        assert_eq!(kit.describe_template("greet").await.unwrap().variables, vec!["name"]);

        assert_eq!(kit.remove_template("greet").await.unwrap().name, "greet");
        assert!(kit.remove_template("greet").await.unwrap_err().is_not_found());
        assert!(!kit.list_templates().await.contains(&"greet".to_string()));
    }

    #[tokio::test]
    async fn test_extra_variables_reach_rag_and_chain_modes() {
        let backend = Arc::new(ScriptedBackend::new());
        let kit = toolkit(backend.clone());
        for doc in sample_documents() {
            kit.add_document(doc).await.unwrap();
        }

        let mut vars = HashMap::new();
        vars.insert("target_language".to_string(), "English".to_string());
        vars.insert("text".to_string(), "你好".to_string());

        kit.ask_with_context("rag", "translation", &vars, 0)
            .await
            .unwrap();
        kit.ask_chained(&StepContext::new(), "rag", "translation", &vars, 0)
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            let sent = &request[0].content;
            assert!(sent.starts_with("请将以下文本翻译成English"));
            assert!(sent.contains("你好"));
        }
    }

    #[tokio::test]
    async fn test_ask_chained_honours_limit() {
        let backend = Arc::new(ScriptedBackend::new());
        let kit = toolkit(backend.clone()).with_rag_limit(5);
        for doc in sample_documents() {
            kit.add_document(doc).await.unwrap();
        }

        kit.ask_chained(&StepContext::new(), "的", "qa", &HashMap::new(), 1)
            .await
            .unwrap();

        let sent = &backend.requests()[0][0].content;
        assert!(sent.contains("文档 1 "));
        assert!(!sent.contains("文档 2 "));
    }

    #[tokio::test]
    async fn test_rag_query_default_limit() {
        let kit = toolkit(Arc::new(ScriptedBackend::new())).with_rag_limit(1);
        for doc in sample_documents() {
            kit.add_document(doc).await.unwrap();
        }

        // "的" appears in all three sample documents
        let result = kit.rag_query("的", 0).await.unwrap();
        assert_eq!(result.documents_retrieved(), 1);
    }
}
