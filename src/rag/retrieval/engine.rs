//! Lexical retrieval over an in-memory document store
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::errors::{LlmError, Result};
use crate::rag::document::Document;

/// Result count used when a caller passes a limit of zero
pub const DEFAULT_LIMIT: usize = 5;

/// A store of documents plus a scoring function over a query.
///
/// Implementations need not be internally synchronized: writes take
/// `&mut self`, and shared access goes through [`SharedRetriever`].
///
/// [`SharedRetriever`]: crate::rag::SharedRetriever
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `limit` relevant documents, each tagged with its score.
    /// A `limit` of zero means [`DEFAULT_LIMIT`].
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Document>>;

    /// Insert a document, replacing any document with the same id
    async fn add_document(&mut self, doc: Document) -> Result<()>;

    /// Remove a document by id, returning it
    async fn remove_document(&mut self, id: &str) -> Result<Document>;
}

/// How positive-score documents are selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Any positive-score documents up to the limit, in store iteration
    /// order. Neither sorted nor guaranteed to be the top scorers.
    #[default]
    Unordered,
    /// Highest score first, ties broken by id, then truncated to the limit
    ByScore,
}

/// Keyword-overlap retriever
#[derive(Debug, Clone, Default)]
pub struct SimpleRetriever {
    documents: HashMap<String, Document>,
    ranking: RankingMode,
}

impl SimpleRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a retriever with an explicit ranking mode
    pub fn with_ranking(ranking: RankingMode) -> Self {
        Self {
            documents: HashMap::new(),
            ranking,
        }
    }

    pub fn ranking(&self) -> RankingMode {
        self.ranking
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn search(&self, query: &str, limit: usize) -> Vec<Document> {
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        let query = query.to_lowercase();
        let mut seen = HashSet::new();
        let words: Vec<&str> = query
            .split_whitespace()
            .filter(|w| seen.insert(*w))
            .collect();

        let scored = self.documents.values().filter_map(|doc| {
            let score = keyword_score(&words, &doc.content);
            (score > 0).then(|| doc.scored(score as f64))
        });

        match self.ranking {
            RankingMode::Unordered => scored.take(limit).collect(),
            RankingMode::ByScore => {
                let mut results: Vec<Document> = scored.collect();
                results.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                });
                results.truncate(limit);
                results
            }
        }
    }
}

/// Count of distinct query words occurring anywhere in `content`
fn keyword_score(words: &[&str], content: &str) -> usize {
    let content = content.to_lowercase();
    words.iter().filter(|w| content.contains(**w)).count()
}

#[async_trait]
impl Retriever for SimpleRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Document>> {
        let results = self.search(query, limit);
        debug!(
            query,
            matched = results.len(),
            stored = self.documents.len(),
            "retrieved documents"
        );
        Ok(results)
    }

    async fn add_document(&mut self, mut doc: Document) -> Result<()> {
        if doc.id.is_empty() {
            return Err(LlmError::invalid_argument("document ID cannot be empty"));
        }
        doc.score = None;
        self.documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn remove_document(&mut self, id: &str) -> Result<Document> {
        self.documents
            .remove(id)
            .ok_or_else(|| LlmError::not_found("document", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    async fn store(docs: &[(&str, &str)]) -> SimpleRetriever {
        let mut retriever = SimpleRetriever::new();
        for (id, content) in docs {
            retriever
                .add_document(Document::new(*id, *content))
                .await
                .unwrap();
        }
        retriever
    }

    #[tokio::test]
    async fn test_retrieve_filters_zero_scores() {
        let retriever = store(&[
            ("a", "Rust has fearless concurrency"),
            ("b", "Nothing relevant here"),
        ])
        .await;

        let results = retriever.retrieve("go concurrency", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert!(results[0].score.unwrap() >= 1.0);
    }

    #[tokio::test]
    async fn test_retrieve_no_match_is_empty() {
        let retriever = store(&[("a", "alpha"), ("b", "beta")]).await;
        let results = retriever.retrieve("zzz", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_score_counts_distinct_tokens_once() {
        let retriever = store(&[("a", "cache cache cache and more cache")]).await;
        let results = retriever.retrieve("Cache cache CACHE more", 5).await.unwrap();
        assert_eq!(results[0].score, Some(2.0));
    }

    #[tokio::test]
    async fn test_token_matches_as_substring() {
        let retriever = store(&[("a", "Concurrency")]).await;
        let results = retriever.retrieve("curr", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_caps_results_and_zero_means_default() {
        let docs: Vec<(String, String)> = (0..8)
            .map(|i| (format!("d{}", i), format!("shared token {}", i)))
            .collect();
        let mut retriever = SimpleRetriever::new();
        for (id, content) in &docs {
            retriever
                .add_document(Document::new(id.as_str(), content.as_str()))
                .await
                .unwrap();
        }

        assert_eq!(retriever.retrieve("shared", 3).await.unwrap().len(), 3);
        assert_eq!(retriever.retrieve("shared", 0).await.unwrap().len(), DEFAULT_LIMIT);
    }

    #[tokio::test]
    async fn test_by_score_ranking_sorts_and_picks_top() {
        let mut retriever = SimpleRetriever::with_ranking(RankingMode::ByScore);
        for (id, content) in [
            ("low", "apple"),
            ("high", "apple banana cherry"),
            ("mid", "apple banana"),
        ] {
            retriever.add_document(Document::new(id, content)).await.unwrap();
        }

        let results = retriever.retrieve("apple banana cherry", 2).await.unwrap();
        let ids: Vec<_> = results.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn test_add_is_last_write_wins() {
        let mut retriever = store(&[("same", "first content")]).await;
        retriever
            .add_document(Document::new("same", "second content"))
            .await
            .unwrap();

        assert_eq!(retriever.len(), 1);
        assert_eq!(retriever.get("same").unwrap().content, "second content");
    }

    #[tokio::test]
    async fn test_add_rejects_empty_id() {
        let mut retriever = SimpleRetriever::new();
        let err = retriever.add_document(Document::new("", "x")).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidArgument(_)));
        assert!(retriever.is_empty());
    }

    #[tokio::test]
    async fn test_stored_documents_carry_no_score() {
        let mut retriever = SimpleRetriever::new();
        let mut doc = Document::new("a", "alpha");
        doc.score = Some(9.0);
        retriever.add_document(doc).await.unwrap();

        retriever.retrieve("alpha", 5).await.unwrap();
        assert!(retriever.get("a").unwrap().score.is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_is_not_found_and_keeps_store() {
        let mut retriever = store(&[("a", "alpha")]).await;

        let err = retriever.remove_document("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(retriever.len(), 1);

        let removed = retriever.remove_document("a").await.unwrap();
        assert_eq!(removed.id, "a");
        assert!(retriever.is_empty());
    }

    #[quickcheck]
    fn prop_results_are_positive_and_capped(contents: Vec<String>, query: String, limit: u8) -> bool {
        let mut retriever = SimpleRetriever::new();
        for (i, content) in contents.into_iter().enumerate() {
            tokio_test::block_on(retriever.add_document(Document::new(i.to_string(), content)))
                .unwrap();
        }
        let limit = limit as usize;
        let results = tokio_test::block_on(retriever.retrieve(&query, limit)).unwrap();
        let cap = if limit == 0 { DEFAULT_LIMIT } else { limit };
        results.len() <= cap && results.iter().all(|d| d.score.unwrap_or(0.0) > 0.0)
    }
}
