//! Configuration management for llm-tools
//!
//! Provides TOML-based configuration with defaults, environment overrides
//! and validation.
//! Location: ~/.llm-tools/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::errors::{LlmError, Result};
use crate::rag::RankingMode;

/// Upper bound on `backend.timeout_secs` (one day)
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Known log levels, lowest verbosity last
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Complete configuration for llm-tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chat backend connection and sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Zero leaves the backend default in place
    pub top_p: f32,
    pub timeout_secs: u64,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub max_results: usize,
    pub ranking: RankingMode,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 0.0,
            timeout_secs: 30,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_results: crate::rag::DEFAULT_LIMIT,
            ranking: RankingMode::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply the
    /// environment (including a `.env` file in the working directory)
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(config_path) = path {
            Self::load_from_file(&config_path)?
        } else {
            Self::load_default()?
        };

        dotenvy::dotenv().ok();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| LlmError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".llm-tools").join("config.toml"))
    }

    /// Override values from environment-style lookups.
    ///
    /// Unset, blank and unparsable values leave the current setting untouched.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.backend.api_key = key;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.backend.model = model;
        }
        override_parsed(&lookup, "OPENAI_TEMPERATURE", &mut self.backend.temperature);
        override_parsed(&lookup, "OPENAI_MAX_TOKENS", &mut self.backend.max_tokens);
        override_parsed(&lookup, "REQUEST_TIMEOUT_SECONDS", &mut self.backend.timeout_secs);
        override_parsed(&lookup, "RAG_MAX_RESULTS", &mut self.rag.max_results);
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(LlmError::ConfigError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.backend.max_tokens == 0 {
            return Err(LlmError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.backend.top_p) {
            return Err(LlmError::ConfigError(
                "top_p must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.backend.timeout_secs == 0 || self.backend.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(LlmError::ConfigError(format!(
                "timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }

        if self.rag.max_results == 0 {
            return Err(LlmError::ConfigError(
                "rag.max_results must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(LlmError::ConfigError(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LlmError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| LlmError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Serialize to TOML with the API key masked
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.backend.api_key.is_empty() {
            shown.backend.api_key = "********".to_string();
        }
        shown.to_toml()
    }

    fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LlmError::ConfigError(format!("Failed to serialize config: {}", e)))
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => debug!(key, raw = %raw, "ignoring unparsable override"),
        }
    }
}
