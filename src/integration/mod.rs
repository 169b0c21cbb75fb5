// Integration module
//
// Wires the prompt engine, the RAG engine, the chain executor and a model
// backend into one request context.

pub mod toolkit;

// Re-export key types
pub use toolkit::{Answer, Toolkit, QUERY_VARIABLE};
