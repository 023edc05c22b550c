//! Client for the techscout proxy gateway.
//!
//! The gateway holds the credential; this client only knows the endpoint.
//! Request: `{prompt, options: {model?, maxTokens, temperature}}`.
//! Success envelope: `{success: true, content, usage}`. Error envelope:
//! `{error}` with a non-success status.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{TextGenerator, http_client, transport_error};
use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::types::{Completion, PhaseRequest, TokenUsage};

/// Body accepted by the gateway's completion route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub prompt: String,
    #[serde(default)]
    pub options: GatewayOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Success envelope returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub content: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

/// Proxied text generator.
pub struct GatewayClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl GatewayClient {
    /// Requires `llm.gateway_url`.
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let endpoint = config
            .gateway_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::Invalid {
                message: "llm.gateway_url must be set when llm.provider = \"gateway\"".into(),
            })?;
        Ok(Self {
            client: http_client(config)?,
            endpoint,
            model: config.model.clone(),
        })
    }

    fn build_request(&self, request: &PhaseRequest) -> GatewayRequest {
        GatewayRequest {
            prompt: request.prompt_text.clone(),
            options: GatewayOptions {
                model: Some(request.model.clone().unwrap_or_else(|| self.model.clone())),
                max_tokens: Some(request.max_output_tokens),
                temperature: Some(request.temperature),
            },
        }
    }

    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        let message = serde_json::from_str::<Value>(body_text)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());
        LlmError::Upstream {
            status_code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl TextGenerator for GatewayClient {
    async fn complete(&self, request: &PhaseRequest) -> Result<Completion, LlmError> {
        let body = self.build_request(request);

        debug!(
            endpoint = self.endpoint.as_str(),
            prompt_chars = request.prompt_text.len(),
            "Sending gateway completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("gateway", &e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| LlmError::transport(format!("Failed to read gateway response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let envelope: GatewayResponse = serde_json::from_str(&body_text)
            .map_err(|e| LlmError::transport(format!("Malformed gateway response: {}", e)))?;
        if !envelope.success {
            return Err(LlmError::transport("Gateway reported success = false"));
        }

        Ok(Completion {
            text: envelope.content,
            model: body.options.model.unwrap_or_default(),
            usage: envelope.usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationParams;

    fn client() -> GatewayClient {
        let config = LlmConfig {
            provider: "gateway".into(),
            gateway_url: Some("http://localhost:8787/api/generate".into()),
            ..Default::default()
        };
        GatewayClient::new(&config).unwrap()
    }

    #[test]
    fn test_build_request_camel_case() {
        let request = PhaseRequest::new("Analyze X", GenerationParams::new(800, 0.2));
        let body = serde_json::to_value(client().build_request(&request)).unwrap();
        assert_eq!(body["prompt"], "Analyze X");
        assert_eq!(body["options"]["maxTokens"], 800);
        assert_eq!(body["options"]["model"], crate::config::DEFAULT_MODEL);
    }

    #[test]
    fn test_request_options_default_when_absent() {
        let parsed: GatewayRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert!(parsed.options.max_tokens.is_none());
        assert!(parsed.options.model.is_none());
    }

    #[test]
    fn test_map_http_error_uses_error_string() {
        let err = GatewayClient::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"API key not configured in environment"}"#,
        );
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("API key not configured"));
    }
}
