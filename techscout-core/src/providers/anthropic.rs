//! Anthropic Messages API client.
//!
//! Sends each prompt as a single user message and returns the concatenation
//! of every `text` content block in the reply.
//!
//! - Auth via `x-api-key` header
//! - Required `anthropic-version` header
//! - Non-success status -> `LlmError::Upstream` with the envelope's
//!   `error.message`
//! - Network failure, timeout, or an unexpected envelope -> `LlmError::Transport`

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{TextGenerator, http_client, transport_error};
use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::types::{Completion, PhaseRequest, TokenUsage};

/// The default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// The required Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Direct client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    /// Create a client, resolving the credential from `config`.
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolve_api_key()?;
        Self::new_with_key(config, api_key)
    }

    /// Create a client with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, ConfigError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: http_client(config)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn build_request_body(&self, request: &PhaseRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.model);
        serde_json::json!({
            "model": model,
            "max_tokens": request.max_output_tokens,
            "temperature": request.temperature,
            "messages": [{
                "role": "user",
                "content": request.prompt_text,
            }],
        })
    }

    /// Turn a success envelope into a `Completion`.
    fn parse_response(body: &Value) -> Result<Completion, LlmError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::transport("Missing 'content' array in response"))?;

        let texts: Vec<&str> = blocks
            .iter()
            .filter(|b| b["type"].as_str() == Some("text"))
            .filter_map(|b| b["text"].as_str())
            .collect();
        if texts.is_empty() {
            return Err(LlmError::transport("Response contained no text content"));
        }

        Ok(Completion {
            text: texts.concat(),
            model: body["model"].as_str().unwrap_or("unknown").to_string(),
            usage: TokenUsage {
                input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0),
                output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0),
            },
        })
    }

    /// Map a non-success status to `Upstream`, keeping the service's message.
    pub(crate) fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        let message = serde_json::from_str::<Value>(body_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());
        LlmError::Upstream {
            status_code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn complete(&self, request: &PhaseRequest) -> Result<Completion, LlmError> {
        let body = self.build_request_body(request);
        let url = format!("{}/messages", self.base_url);

        debug!(
            model = request.model.as_deref().unwrap_or(&self.model),
            url = url.as_str(),
            prompt_chars = request.prompt_text.len(),
            max_tokens = request.max_output_tokens,
            "Sending Anthropic completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Anthropic API", &e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| LlmError::transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value = serde_json::from_str(&body_text)
            .map_err(|e| LlmError::transport(format!("Invalid JSON in response: {}", e)))?;

        Self::parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
