//! Command-line argument parsing for llm-tools
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// llm-tools - Prompt templates, keyword RAG and step chains over a chat model
#[derive(Parser, Debug)]
#[command(name = "llm-tools")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Prompt templates, keyword RAG and step chains over an OpenAI-compatible model", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Model name, overrides the configuration
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// API key, overrides the configuration and OPENAI_API_KEY
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the model a question through a template
    Ask {
        /// The question
        query: String,

        /// Template name
        #[arg(short, long, default_value = "qa")]
        template: String,

        /// Extra template variable (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,

        /// Run as a retrieval -> template -> model chain
        #[arg(long, conflicts_with = "rag")]
        chain: bool,

        /// Augment the question with retrieved documents first
        #[arg(long)]
        rag: bool,

        /// Maximum documents to retrieve (0 uses the configured value)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,

        /// Load the built-in sample documents
        #[arg(long)]
        samples: bool,

        /// Extra document (repeatable)
        #[arg(long = "doc", value_name = "ID=CONTENT", value_parser = parse_key_value)]
        docs: Vec<(String, String)>,
    },

    /// Render a template without calling the model
    Render {
        /// Template name
        template: String,

        /// Template variable (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },

    /// List templates, or show one
    Templates {
        /// Template to show
        name: Option<String>,
    },

    /// Run a RAG query without calling the model
    Rag {
        /// The query
        query: String,

        /// Extra document (repeatable)
        #[arg(long = "doc", value_name = "ID=CONTENT", value_parser = parse_key_value)]
        docs: Vec<(String, String)>,

        /// Skip the built-in sample documents
        #[arg(long)]
        no_samples: bool,

        /// Maximum documents to retrieve (0 uses the configured value)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.backend.model = model.clone();
        }
        if let Some(key) = &self.api_key {
            config.backend.api_key = key.clone();
        }
        if let Some(url) = &self.base_url {
            config.backend.base_url = url.clone();
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Log level for this verbosity, `configured` at normal verbosity
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => configured,
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show prompts and token usage
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

/// Parse a `NAME=VALUE` pair; the value may itself contain `=`
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
