//! Built-in prompt templates
//!
//! These texts are consumed by existing callers and must stay byte-for-byte
//! stable.

use crate::prompt::template::Template;

pub const QA_TEMPLATE: &str = "请回答以下问题：\n\n{{.question}}\n\n请提供详细、准确的答案。";

pub const TRANSLATION_TEMPLATE: &str = "请将以下文本翻译成{{.target_language}}：\n\n{{.text}}\n\n请保持原文的意思和风格。";

pub const SUMMARY_TEMPLATE: &str = "请总结以下文本的主要内容：\n\n{{.text}}\n\n请提供简洁、准确的总结。";

pub const CODE_REVIEW_TEMPLATE: &str = "请对以下代码进行审查：\n\n```{{.language}}\n{{.code}}\n```\n\n请从代码质量、安全性、性能等方面进行评估，并提供改进建议。";

/// Version label shared by the built-in templates
pub const DEFAULT_TEMPLATE_VERSION: &str = "1.0";

/// The four built-in templates: `qa`, `translation`, `summary`, `code_review`
pub fn default_templates() -> Vec<Template> {
    vec![
        Template::new("qa", QA_TEMPLATE)
            .with_version(DEFAULT_TEMPLATE_VERSION)
            .with_metadata("type", "question-answer"),
        Template::new("translation", TRANSLATION_TEMPLATE)
            .with_version(DEFAULT_TEMPLATE_VERSION)
            .with_metadata("type", "translation"),
        Template::new("summary", SUMMARY_TEMPLATE)
            .with_version(DEFAULT_TEMPLATE_VERSION)
            .with_metadata("type", "summarization"),
        Template::new("code_review", CODE_REVIEW_TEMPLATE)
            .with_version(DEFAULT_TEMPLATE_VERSION)
            .with_metadata("type", "code-review"),
    ]
}
