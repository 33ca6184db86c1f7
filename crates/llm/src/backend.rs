//! OpenAI-compatible chat backend
//!
//! The reference deployment talks to Groq's OpenAI-compatible
//! `chat/completions` endpoint, but nothing here is Groq-specific: any
//! endpoint speaking the same shape works. Requests carry a bounded
//! timeout that is fatal to the request only, never the session.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::prompt::Message;
use crate::LlmError;
use tutor_agent_config::LlmSettings;

/// Language model boundary
///
/// The reply is a single text blob; parsing it is the extractor's job,
/// never the backend's.
#[async_trait]
pub trait LlmBackend: Send + Sync + 'static {
    /// Run one chat completion and return the raw reply text
    async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, LlmError>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Configuration for the OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Chat completions endpoint URL
    pub endpoint: String,
    /// API key (bearer auth)
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl OpenAiCompatConfig {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            timeout: settings.timeout(),
        }
    }
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default())
    }
}

/// Backend posting to an OpenAI-compatible chat completions endpoint
pub struct OpenAiCompatBackend {
    config: OpenAiCompatConfig,
    client: Client,
}

impl OpenAiCompatBackend {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "API key not set; supply it via settings or TUTOR_AGENT_LLM__API_KEY".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatBackend {
    async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, LlmError> {
        let wire_messages: Vec<WireMessage> = messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: wire_messages,
            temperature: self.config.temperature,
            max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        tracing::debug!(model = %self.config.model, max_tokens, "chat completion request");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(error_text));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_rejected_at_construction() {
        let config = OpenAiCompatConfig::default();
        assert!(matches!(
            OpenAiCompatBackend::new(config),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_backend_with_key() {
        let config = OpenAiCompatConfig {
            api_key: "gsk_test".to_string(),
            ..Default::default()
        };
        let backend = OpenAiCompatBackend::new(config).unwrap();
        assert_eq!(backend.model_name(), "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"speech\":\"hi\"}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"speech\":\"hi\"}");
    }
}
