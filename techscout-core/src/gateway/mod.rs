//! Credential-injecting proxy gateway built on axum.
//!
//! Exposes a single completion route (default `/api/generate`) that accepts
//! `{prompt, options}` and forwards it to the Anthropic Messages API with a
//! server-side key, so clients never hold the credential. Every response
//! carries CORS headers; `OPTIONS` answers 200 with an empty body.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    middleware::map_response_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::{GatewayConfig, TechScoutConfig};
use crate::error::{ConfigError, LlmError};
use crate::providers::gateway::GatewayRequest;
use crate::providers::{AnthropicClient, TextGenerator};
use crate::types::{PhaseRequest, TokenUsage};

/// Shared state for gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// `None` when no server-side credential is configured.
    generator: Option<Arc<dyn TextGenerator>>,
    config: Arc<GatewayConfig>,
    allow_origin: HeaderValue,
    default_model: String,
}

impl GatewayState {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        config: GatewayConfig,
        default_model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if !config.route.starts_with('/') || config.route == "/health" {
            return Err(ConfigError::Invalid {
                message: format!("gateway.route '{}' is not a usable path", config.route),
            });
        }
        let allow_origin =
            HeaderValue::from_str(&config.allowed_origin).map_err(|_| ConfigError::Invalid {
                message: format!(
                    "gateway.allowed_origin '{}' is not a valid header value",
                    config.allowed_origin
                ),
            })?;
        Ok(Self {
            generator,
            config: Arc::new(config),
            allow_origin,
            default_model: default_model.into(),
        })
    }

    /// Build the state from the full configuration.
    ///
    /// A missing credential is not an error here: the gateway starts and
    /// answers completion requests with 500 until one is configured.
    pub fn from_config(config: &TechScoutConfig) -> Result<Self, ConfigError> {
        let generator: Option<Arc<dyn TextGenerator>> = match AnthropicClient::new(&config.llm) {
            Ok(client) => Some(Arc::new(client)),
            Err(ConfigError::MissingCredential { var }) => {
                warn!(var = var.as_str(), "No API key configured; completion requests will fail");
                None
            }
            Err(e) => return Err(e),
        };
        Self::new(generator, config.gateway.clone(), config.llm.model.clone())
    }

    pub fn has_credential(&self) -> bool {
        self.generator.is_some()
    }
}

/// Build an axum Router with the completion route and `/health`.
pub fn router(state: GatewayState) -> Router {
    let route = state.config.route.clone();
    Router::new()
        .route(
            &route,
            post(generate_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health_handler))
        .layer(map_response_with_state(state.clone(), apply_cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the gateway on `config.bind` until `shutdown` is cancelled.
pub async fn run(state: GatewayState, shutdown: CancellationToken) -> Result<(), std::io::Error> {
    let bind = state.config.bind.clone();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %listener.local_addr()?, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn apply_cors(State(state): State<GatewayState>, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, state.allow_origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Completion endpoint.
async fn generate_handler(State(state): State<GatewayState>, body: Bytes) -> Response {
    // Unparseable bodies and blank prompts are both client errors.
    let request = match serde_json::from_slice::<GatewayRequest>(&body) {
        Ok(req) if !req.prompt.trim().is_empty() => req,
        _ => return error_response(StatusCode::BAD_REQUEST, "Prompt is required"),
    };

    let Some(generator) = state.generator.as_ref() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "API key not configured in environment",
        );
    };

    let options = request.options;
    let phase_request = PhaseRequest {
        prompt_text: request.prompt,
        max_output_tokens: options
            .max_tokens
            .unwrap_or(state.config.default_max_tokens),
        temperature: options
            .temperature
            .unwrap_or(state.config.default_temperature)
            .clamp(0.0, 1.0),
        model: Some(options.model.unwrap_or_else(|| state.default_model.clone())),
    };

    debug!(
        model = phase_request.model.as_deref().unwrap_or_default(),
        prompt_chars = phase_request.prompt_text.len(),
        max_tokens = phase_request.max_output_tokens,
        "Forwarding completion request"
    );

    match generator.complete(&phase_request).await {
        Ok(completion) => {
            let usage: TokenUsage = completion.usage;
            Json(serde_json::json!({
                "success": true,
                "content": completion.text,
                "usage": usage,
            }))
            .into_response()
        }
        Err(LlmError::Upstream {
            status_code,
            message,
        }) => {
            warn!(status_code, message = message.as_str(), "Upstream completion error");
            let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(status, message)
        }
        Err(LlmError::Transport { message }) => {
            warn!(message = message.as_str(), "Completion transport error");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", message),
            )
        }
    }
}
