// RAG engine: retrieve, then fold the documents into an augmented query
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{LlmError, Result};
use crate::rag::context::{AssembledContext, ContextBuilder};
use crate::rag::retrieval::Retriever;

/// Retriever handle shared between RAG engines, steps and writers
pub type SharedRetriever = Arc<RwLock<dyn Retriever>>;

/// RAG query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResult {
    /// Original query
    pub query: String,
    /// Augmented prompt, or the fallback text when nothing matched
    pub augmented_prompt: String,
    /// Assembled context
    pub context: AssembledContext,
}

impl RagResult {
    pub fn documents_retrieved(&self) -> usize {
        self.context.document_count
    }
}

/// Composes a retriever's output into one prompt-ready string.
///
/// The engine does not own its retriever; several engines may share one.
#[derive(Clone)]
pub struct RagEngine {
    retriever: SharedRetriever,
    context_builder: ContextBuilder,
}

impl RagEngine {
    pub fn new(retriever: SharedRetriever) -> Self {
        Self {
            retriever,
            context_builder: ContextBuilder::new(),
        }
    }

    /// The retriever this engine reads from
    pub fn retriever(&self) -> &SharedRetriever {
        &self.retriever
    }

    /// Retrieve and augment, returning the full result
    pub async fn execute(&self, query: &str, limit: usize) -> Result<RagResult> {
        let documents = {
            let retriever = self.retriever.read().await;
            retriever
                .retrieve(query, limit)
                .await
                .map_err(|e| LlmError::Retrieval(Box::new(e)))?
        };

        debug!(query, documents = documents.len(), "rag query");

        Ok(RagResult {
            query: query.to_string(),
            augmented_prompt: self.context_builder.augment_prompt(query, &documents),
            context: self.context_builder.build(&documents),
        })
    }

    /// Retrieve and return only the augmented query string.
    ///
    /// A retrieval miss is not an error: the fallback text comes back.
    pub async fn query(&self, query: &str, limit: usize) -> Result<String> {
        Ok(self.execute(query, limit).await?.augmented_prompt)
    }
}
