// RAG (Retrieval-Augmented Generation) module
//
// Lexical retrieval over an in-memory store and augmentation of a query
// with the retrieved text.
//
// Components:
// - Document: stored unit plus its transient retrieval score
// - Retrieval: retriever contract and keyword-overlap store
// - Context Builder: numbered, scored context block
// - Pipeline: RAG engine tying retrieval and context together

pub mod context;
pub mod document;
pub mod pipeline;
pub mod retrieval;

// Re-export key types
pub use context::{ContextBuilder, NO_RELEVANT_DOCUMENTS};
pub use document::{sample_documents, Document};
pub use pipeline::{RagEngine, RagResult, SharedRetriever};
pub use retrieval::{RankingMode, Retriever, SimpleRetriever, DEFAULT_LIMIT};
