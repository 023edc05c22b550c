//! Text-generation client implementations.
//!
//! Provides concrete implementations of the [`TextGenerator`] trait for:
//! - the Anthropic Messages API, called directly with a local credential
//! - the techscout proxy gateway, which injects the credential server-side
//! - a scripted mock for tests and dry runs
//!
//! Use [`create_generator`] to instantiate the appropriate client from config.
//! No implementation retries: one call to `complete` is one outbound request.

pub mod anthropic;
pub mod gateway;
pub mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::types::{Completion, GenerationParams, PhaseRequest};

pub use anthropic::AnthropicClient;
pub use gateway::GatewayClient;
pub use mock::MockGenerator;

/// An opaque text-completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Perform one completion.
    async fn complete(&self, request: &PhaseRequest) -> Result<Completion, LlmError>;

    /// Prompt in, text out.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let request = PhaseRequest::new(prompt, *params);
        self.complete(&request).await.map(|c| c.text)
    }

    /// Model used when a request carries no override.
    fn model_name(&self) -> &str;
}

/// Build the shared HTTP client with the configured timeouts.
pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| ConfigError::Invalid {
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// Map a reqwest failure that prevented a response from arriving.
pub(crate) fn transport_error(service: &str, err: &reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::transport(format!("Request to {} timed out: {}", service, err))
    } else {
        LlmError::transport(format!("Request to {} failed: {}", service, err))
    }
}

/// Create a text generator based on `config.provider`.
///
/// Credential and endpoint problems surface here, before any network call.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, ConfigError> {
    match config.provider.as_str() {
        "anthropic" => {
            let api_key = config.resolve_api_key()?;
            Ok(Arc::new(AnthropicClient::new_with_key(config, api_key)?))
        }
        "gateway" => Ok(Arc::new(GatewayClient::new(config)?)),
        other => Err(ConfigError::Invalid {
            message: format!(
                "unknown llm.provider '{}' (expected 'anthropic' or 'gateway')",
                other
            ),
        }),
    }
}
