// Context builder for RAG-augmented prompts
use serde::{Deserialize, Serialize};

use crate::rag::document::Document;

/// Returned instead of an augmented prompt when retrieval finds nothing
pub const NO_RELEVANT_DOCUMENTS: &str = "抱歉，没有找到相关的文档信息。";

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context block
    pub text: String,
    /// Number of documents included
    pub document_count: usize,
    /// Document IDs included, in context order
    pub document_ids: Vec<String>,
}

/// Folds retrieved documents into a single augmented query string
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the context block: each document gets a 1-based header with
    /// its score, then its content, then a blank line.
    pub fn build(&self, documents: &[Document]) -> AssembledContext {
        let mut text = String::new();
        let mut document_ids = Vec::with_capacity(documents.len());

        for (idx, doc) in documents.iter().enumerate() {
            text.push_str(&format!(
                "文档 {} (相关度: {:.2}):\n",
                idx + 1,
                doc.score.unwrap_or(0.0)
            ));
            text.push_str(&doc.content);
            text.push_str("\n\n");
            document_ids.push(doc.id.clone());
        }

        AssembledContext {
            text,
            document_count: documents.len(),
            document_ids,
        }
    }

    /// Wrap `query` with the instruction preamble and the context block.
    ///
    /// With no documents the fixed fallback text is returned instead.
    pub fn augment_prompt(&self, query: &str, documents: &[Document]) -> String {
        if documents.is_empty() {
            return NO_RELEVANT_DOCUMENTS.to_string();
        }

        let context = self.build(documents);
        format!(
            "基于以下上下文信息回答问题：\n\n上下文：\n{}\n\n问题：{}",
            context.text, query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, content: &str, score: f64) -> Document {
        let mut doc = Document::new(id, content);
        doc.score = Some(score);
        doc
    }

    #[test]
    fn test_build_empty_documents() {
        let context = ContextBuilder::new().build(&[]);
        assert_eq!(context.document_count, 0);
        assert!(context.text.is_empty());
    }

    #[test]
    fn test_build_formats_index_and_score() {
        let docs = vec![scored("a", "First", 2.0), scored("b", "Second", 1.0)];
        let context = ContextBuilder::new().build(&docs);

        assert_eq!(
            context.text,
            "文档 1 (相关度: 2.00):\nFirst\n\n文档 2 (相关度: 1.00):\nSecond\n\n"
        );
        assert_eq!(context.document_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_augment_prompt_contains_content_and_query() {
        let docs = vec![scored("a", "Background info", 1.0)];
        let augmented = ContextBuilder::new().augment_prompt("What is the answer?", &docs);

        assert!(augmented.starts_with("基于以下上下文信息回答问题："));
        assert!(augmented.contains("Background info"));
        assert!(augmented.ends_with("问题：What is the answer?"));
    }

    #[test]
    fn test_augment_prompt_without_documents_is_fallback() {
        let augmented = ContextBuilder::new().augment_prompt("anything", &[]);
        assert_eq!(augmented, NO_RELEVANT_DOCUMENTS);
    }
}
