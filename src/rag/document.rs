//! Document type for the lexical retriever

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A retrievable document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Relevance score; only set on documents returned by a retrieval call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
            score: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn scored(&self, score: f64) -> Self {
        Self {
            score: Some(score),
            ..self.clone()
        }
    }
}

/// Small built-in knowledge base used by the CLI demo mode
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document::new(
            "doc1",
            "LangChain 是一个用于开发由语言模型驱动的应用程序的框架。它提供了模块化的组件和预构建的链，使开发人员能够快速构建复杂的应用程序。",
        )
        .with_metadata("source", "langchain_docs")
        .with_metadata("type", "framework"),
        Document::new(
            "doc2",
            "RAG (Retrieval-Augmented Generation) 是一种结合了信息检索和文本生成的技术。它首先从知识库中检索相关信息，然后使用这些信息来生成更准确、更相关的回答。",
        )
        .with_metadata("source", "rag_paper")
        .with_metadata("type", "technique"),
        Document::new(
            "doc3",
            "Prompt Engineering 是设计和优化提示词的艺术和科学，目的是从语言模型中获得更好的输出。它包括理解模型的局限性、设计有效的提示词模板等。",
        )
        .with_metadata("source", "prompt_engineering_guide")
        .with_metadata("type", "technique"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new("d1", "content").with_metadata("source", "unit");
        assert_eq!(doc.id, "d1");
        assert_eq!(doc.metadata.get("source").map(String::as_str), Some("unit"));
        assert!(doc.score.is_none());
    }

    #[test]
    fn test_scored_copy_leaves_original_untouched() {
        let doc = Document::new("d1", "content");
        let scored = doc.scored(2.0);
        assert_eq!(scored.score, Some(2.0));
        assert!(doc.score.is_none());
    }

    #[test]
    fn test_score_skipped_when_absent() {
        let json = serde_json::to_string(&Document::new("d1", "c")).unwrap();
        assert!(!json.contains("score"));
    }

    #[test]
    fn test_sample_documents() {
        let docs = sample_documents();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc1", "doc2", "doc3"]);
        assert!(docs[0].content.starts_with("LangChain"));
    }
}
