//! Prompt engine: named template registry and rendering
//!
//! The engine is not internally synchronized. Share it behind
//! `Arc<tokio::sync::RwLock<PromptEngine>>` when templates are mutated
//! while other tasks render.

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{LlmError, Result};
use crate::prompt::defaults::default_templates;
use crate::prompt::template::{extract_variables, Bindings, Template};

/// Registry of named prompt templates
#[derive(Debug, Clone, Default)]
pub struct PromptEngine {
    templates: HashMap<String, Template>,
}

impl PromptEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Create an engine with the built-in templates registered
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        for template in default_templates() {
            engine.insert(template);
        }
        engine
    }

    /// Register a template, replacing any template with the same name.
    ///
    /// `variables` is recomputed from `content`; whatever the caller put
    /// there is discarded.
    pub fn add_template(&mut self, template: Template) -> Result<()> {
        if template.name.is_empty() {
            return Err(LlmError::invalid_argument("template name cannot be empty"));
        }
        if template.content.is_empty() {
            return Err(LlmError::invalid_argument("template content cannot be empty"));
        }

        self.insert(template);
        Ok(())
    }

    fn insert(&mut self, mut template: Template) {
        template.variables = extract_variables(&template.content);
        debug!(
            template = %template.name,
            variables = ?template.variables,
            "registered template"
        );
        self.templates.insert(template.name.clone(), template);
    }

    /// Look up a template by name
    pub fn get_template(&self, name: &str) -> Result<&Template> {
        self.templates
            .get(name)
            .ok_or_else(|| LlmError::not_found("template", name))
    }

    /// Render a registered template against `bindings`
    pub fn render(&self, name: &str, bindings: &Bindings) -> Result<String> {
        self.get_template(name)?.render(bindings)
    }

    /// Render with plain string variables
    pub fn render_with_variables(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String> {
        let bindings: Bindings = variables
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.render(name, &bindings)
    }

    /// Names of all registered templates, in no particular order
    pub fn list_templates(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    /// Remove a template, returning it
    pub fn remove_template(&mut self, name: &str) -> Result<Template> {
        self.templates
            .remove(name)
            .ok_or_else(|| LlmError::not_found("template", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
