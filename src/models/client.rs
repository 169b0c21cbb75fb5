//! OpenAI-compatible chat completions client
//!
//! Talks to `POST {base_url}/chat/completions`. Works with the OpenAI API
//! and with compatible servers (Ollama's `/v1`, vLLM, LM Studio, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::errors::{LlmError, Result};
use crate::models::backend::ModelBackend;
use crate::models::types::{ChatParameters, ChatResponse, Completion, Message, Usage};

/// HTTP client for an OpenAI-compatible chat endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Create a client from backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Check if the endpoint answers its model listing
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        match self.authorize(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiClient {
    async fn chat(&self, messages: &[Message], params: &ChatParameters) -> Result<ChatResponse> {
        if params.stream {
            return Err(LlmError::invalid_argument(
                "streaming responses are not supported",
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request = WireRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            stream: params.stream,
        };

        debug!(model = %params.model, messages = messages.len(), "sending chat request");

        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::backend(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(%status, "chat request rejected");
            return Err(LlmError::backend(format!("HTTP {}: {}", status, error_text)));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::backend(format!("Failed to parse response: {}", e)))?;

        Ok(wire.into())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Chat completion request body; zero values are omitted
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "is_zero_f32")]
    temperature: f32,
    #[serde(skip_serializing_if = "is_zero_u32")]
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    top_p: f32,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    index: u32,
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<WireResponse> for ChatResponse {
    fn from(wire: WireResponse) -> Self {
        ChatResponse {
            id: wire.id,
            model: wire.model,
            completions: wire
                .choices
                .into_iter()
                .map(|choice| Completion {
                    index: choice.index,
                    role: choice.message.role,
                    content: choice.message.content.unwrap_or_default(),
                    finish_reason: choice.finish_reason.unwrap_or_default(),
                })
                .collect(),
            usage: wire.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new(&BackendConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash_and_keeps_key() {
        let config = BackendConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: "sk-test".to_string(),
            ..Default::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
        assert_eq!(client.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_request_omits_zero_values() {
        let messages = vec![Message::user("hi")];
        let request = WireRequest {
            model: "m",
            messages: &messages,
            temperature: 0.0,
            max_tokens: 0,
            top_p: 0.0,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[test]
    fn test_response_conversion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-3.5-turbo",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
        }"#;
        let wire: WireResponse = serde_json::from_str(body).unwrap();
        let response = ChatResponse::from(wire);

        assert_eq!(response.first_content(), Some("Hello"));
        assert_eq!(response.completions[0].finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 6);
    }

    #[tokio::test]
    async fn test_stream_flag_is_rejected() {
        let client = OpenAiClient::new(&BackendConfig::default()).unwrap();
        let params = ChatParameters {
            stream: true,
            ..Default::default()
        };
        let err = client.chat(&[Message::user("x")], &params).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidArgument(_)));
    }

    #[tokio::test]
    #[ignore] // Requires a reachable endpoint
    async fn test_health_check_integration() {
        let client = OpenAiClient::new(&BackendConfig::default()).unwrap();
        assert!(client.health_check().await.is_ok());
    }
}
