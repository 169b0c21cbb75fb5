// Retrieval module: retriever contract and the keyword-overlap store
pub mod engine;

pub use engine::{RankingMode, Retriever, SimpleRetriever, DEFAULT_LIMIT};
