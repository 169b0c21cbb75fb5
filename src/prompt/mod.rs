//! Prompt module
//!
//! Named templates with `{{.variable}}` placeholders, free-variable
//! extraction and rendering against a binding map.

pub mod defaults;
pub mod engine;
pub mod template;

// Re-export commonly used types
pub use defaults::default_templates;
pub use engine::PromptEngine;
pub use template::{extract_variables, Bindings, Template};
