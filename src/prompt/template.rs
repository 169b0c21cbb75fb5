//! Prompt template type and the `{{.name}}` substitution engine
//!
//! The placeholder language is deliberately tiny: a placeholder is a bare
//! identifier prefixed with a dot inside double braces. There are no
//! conditionals, loops or pipelines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{LlmError, Result};

/// Variable bindings used when rendering a template
pub type Bindings = HashMap<String, Value>;

/// A named prompt template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub version: String,
    /// Placeholder names in order of first appearance, recomputed on registration
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Template {
    /// Create a template with an empty version and no metadata
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            variables: extract_variables(&content),
            content,
            version: String::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Render this template's content against `bindings`
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        render_content(&self.name, &self.content, bindings)
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\.(\w+)\}\}").expect("placeholder pattern is valid"))
}

/// Collect distinct `{{.name}}` placeholders in order of first appearance
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholder_regex()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Substitute every placeholder in `content`.
///
/// Fails when a placeholder has no binding (or is bound to `null`), when an
/// action is not a plain `.name` reference, or when a `{{` is never closed.
pub(crate) fn render_content(template: &str, content: &str, bindings: &Bindings) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find("}}").ok_or_else(|| {
            let offset = content.len() - rest.len() + open;
            LlmError::template_render(template, format!("unclosed action at byte {}", offset))
        })?;

        let action = after_open[..close].trim();
        let name = action
            .strip_prefix('.')
            .filter(|name| is_identifier(name))
            .ok_or_else(|| {
                LlmError::template_render(template, format!("unsupported action '{}'", action))
            })?;

        let value = bindings
            .get(name)
            .and_then(value_to_text)
            .ok_or_else(|| {
                LlmError::template_render(template, format!("no value for variable '{}'", name))
            })?;
        out.push_str(&value);

        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
