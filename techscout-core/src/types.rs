//! Core type definitions shared across the research workflow.
//!
//! Defines the request/response shapes exchanged with the text-generation
//! service. Session and artifact types live next to the code that owns them
//! (`research::session`, `artifacts`).

use serde::{Deserialize, Serialize};

/// Generation parameters for a single completion call.
///
/// These are hints passed through to the service; the prompt itself is never
/// truncated to fit them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    pub fn new(max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            max_output_tokens,
            temperature: temperature.clamp(0.0, 1.0),
        }
    }
}

/// One phase invocation against the text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRequest {
    /// Full instruction text sent to the model.
    pub prompt_text: String,
    pub max_output_tokens: u32,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
    /// Model override; the client's configured model is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl PhaseRequest {
    pub fn new(prompt_text: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            max_output_tokens: params.max_output_tokens,
            temperature: params.temperature,
            model: None,
        }
    }

    /// Builder: override the model for this request only.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

/// Token usage reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text, uninterpreted.
    pub text: String,
    /// Model that produced the text, as reported by the service.
    pub model: String,
    pub usage: TokenUsage,
}
